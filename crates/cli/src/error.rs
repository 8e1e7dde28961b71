/// Process exit status this binary can report.
///
/// Device discovery and multi-device selection belong to the enumeration
/// backend this crate does not implement, so only the codes a
/// directory-to-directory run can actually produce are represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The run completed with no fatal per-file failure.
    Ok,
    /// A per-file write exhausted its retry budget, or the synchronizer
    /// reported another non-interrupt error.
    Failed,
    /// Arguments could not be parsed, or the destination could not be
    /// reached or created.
    InvalidArgument,
    /// A `SIGINT` interrupted the run before it completed.
    Interrupted,
}

impl ExitStatus {
    /// The numeric exit code for this status.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed => 1,
            Self::InvalidArgument => 2,
            Self::Interrupted => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_documented_values() {
        assert_eq!(ExitStatus::Ok.code(), 0);
        assert_eq!(ExitStatus::Failed.code(), 1);
        assert_eq!(ExitStatus::InvalidArgument.code(), 2);
        assert_eq!(ExitStatus::Interrupted.code(), 130);
    }
}
