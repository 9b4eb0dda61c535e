//! OTP delivery seam.
//!
//! The gateway never places SMS network calls itself. Deployments wire a
//! real sender behind [`SmsSender`]; the default [`SimulatedSms`] only
//! logs, and its dispatch mode tells callers to echo the code back in
//! the API response instead.

use std::fmt;

use async_trait::async_trait;

use crate::error::ApiError;

/// How an OTP left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpDispatch {
    /// Delivered through a real SMS provider.
    Sms,
    /// No provider configured; the caller should surface the code.
    Simulation,
}

/// Sends one-time passwords to a phone number.
#[async_trait]
pub trait SmsSender: Send + Sync + fmt::Debug {
    /// Dispatches `code` to `phone` and reports how it went out.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] when a configured provider fails.
    async fn send_otp(&self, phone: &str, code: &str) -> Result<OtpDispatch, ApiError>;
}

/// Default sender: no provider, simulation mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSms;

#[async_trait]
impl SmsSender for SimulatedSms {
    async fn send_otp(&self, phone: &str, _code: &str) -> Result<OtpDispatch, ApiError> {
        tracing::info!(phone, "otp dispatch simulated, echoing code in response");
        Ok(OtpDispatch::Simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_sender_reports_simulation_mode() {
        let sender = SimulatedSms;
        let dispatch = sender.send_otp("+15550001111", "123456").await;
        assert_eq!(dispatch.ok(), Some(OtpDispatch::Simulation));
    }
}
