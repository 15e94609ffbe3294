//! Programmable transfer destinations

use crate::custody::CustodyHandle;
use crate::ledger::TransferRequest;

/// Code that runs when a destination is paid
///
/// Returning an error rejects the transfer, which rolls back the whole
/// execution that triggered it. Receivers run while the custody engine is
/// mid-execution and may call back into it through `custody`.
pub trait Receiver: Send + Sync {
    fn on_receive(
        &self,
        custody: &dyn CustodyHandle,
        request: &TransferRequest,
    ) -> Result<(), String>;
}

impl<F> Receiver for F
where
    F: Fn(&dyn CustodyHandle, &TransferRequest) -> Result<(), String> + Send + Sync,
{
    fn on_receive(
        &self,
        custody: &dyn CustodyHandle,
        request: &TransferRequest,
    ) -> Result<(), String> {
        self(custody, request)
    }
}

/// Destination that refuses every payment
#[derive(Clone, Debug)]
pub struct RejectAll {
    reason: String,
}

impl RejectAll {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Receiver for RejectAll {
    fn on_receive(&self, _: &dyn CustodyHandle, _: &TransferRequest) -> Result<(), String> {
        Err(self.reason.clone())
    }
}

/// Destination that only accepts payments carrying a non-empty payload
#[derive(Clone, Copy, Debug, Default)]
pub struct RequirePayload;

impl Receiver for RequirePayload {
    fn on_receive(&self, _: &dyn CustodyHandle, request: &TransferRequest) -> Result<(), String> {
        if request.payload.is_empty() {
            Err("payload required".to_string())
        } else {
            Ok(())
        }
    }
}
