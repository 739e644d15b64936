pub mod mails;
pub mod sendmail;

pub use mails::Mailer;
