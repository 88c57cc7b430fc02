/// Outcome of [`crate::unpack`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    pub files:       usize,
    pub directories: usize,
    /// Entries that were entirely consumed by segment stripping.
    pub stripped:    usize,
    /// Entry names skipped because they resolved outside the destination.
    pub rejected:    Vec<String>,
    pub total_bytes: u64,
}

/// Outcome of [`crate::pack_dir`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Entry names written, in archive order.
    pub entries:     Vec<String>,
    pub skipped:     usize,
    pub total_bytes: u64,
}
