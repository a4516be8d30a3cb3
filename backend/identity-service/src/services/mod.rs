/// Service layer for identity-service
///
/// - Registration (rider and driver accounts)
/// - Sessions (login, refresh, password change)
/// - Password reset (request, deliver, consume)
/// - Account administration (lookup, deletion)
/// - Email delivery (SMTP)
pub mod accounts;
pub mod email;
pub mod password_reset;
pub mod registration;
pub mod session;

pub use accounts::AccountService;
pub use email::{Mailer, SmtpMailer};
pub use password_reset::{PasswordResetService, ResetRequested, RESET_REQUESTED_MESSAGE};
pub use registration::RegistrationService;
pub use session::SessionService;
