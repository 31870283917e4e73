#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Tell the background task to stop producing.
    CancelSource,
    /// The requested number of rows is in; the final table can be exported.
    ExportReady,
}
