pub mod extract;
pub mod response;
pub mod status_code;

pub use extract::{FormFields, JsonBody, PathId};
pub use response::{ApiError, ApiResponse, INTERNAL_SERVER_ERROR_MESSAGE};
pub use status_code::StatusCode;
