/// A filesystem object's identity and timestamps, as reported by
/// [`FileSystem::stat`](crate::FileSystem::stat).
#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    /// The file's base name (last path component).
    pub name: String,
    /// Exact byte length.
    pub size: u64,
    /// Seconds since the Unix epoch, last content modification.
    pub last_modified: f64,
    /// Seconds since the Unix epoch, last access.
    pub last_accessed: f64,
    /// Seconds since the Unix epoch, creation time, when the underlying
    /// filesystem exposes one.
    pub created_time: Option<f64>,
}
