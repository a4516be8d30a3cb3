/// Data models for identity and credential recovery
pub mod account;
pub mod reset_token;

pub use account::{
    Account, ChangePasswordRequest, DriverDocuments, ForgotPasswordRequest, LoginRequest,
    RegistrationRequest, ResetPasswordRequest, Role,
};
pub use reset_token::{ResetToken, ResetTokenState};
