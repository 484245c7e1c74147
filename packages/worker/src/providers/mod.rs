pub mod resend;

pub use resend::ResendProvider;
