/// All errors that can be returned by an [`AlmanacStore`](crate::AlmanacStore).
#[derive(Debug, thiserror::Error)]
pub enum AlmanacError {
    /// The persisted document is not a JSON array of service records.
    #[error("problem parsing almanac: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading, seeking, truncating or writing the backing store failed.
    #[error("almanac backing store I/O failed during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl AlmanacError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| AlmanacError::Io { context, source }
    }
}
