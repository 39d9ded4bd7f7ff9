/// Terminal compilation failure.
///
/// Compilation is best-effort: structural and semantic problems surface
/// as diagnostics, not errors. The one exception is input that cannot be
/// segmented into blocks at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The source has non-blank, non-comment content but not a single
    /// recognizable `Scenario:`, `Definition:`, or `Schedule:` header.
    #[error("no Courgette blocks found: expected at least one 'Scenario:', 'Definition:', or 'Schedule:' header")]
    NoBlocks,
}
