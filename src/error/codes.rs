#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    GeneralError = 1,
    InvalidArguments = 2,
    SourceNotFound = 3,
    DestinationError = 4,
    NoHistory = 5,
    LedgerError = 6,
    TargetNotFound = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}
