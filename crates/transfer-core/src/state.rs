//! The transfer record and its lifecycle.
//!
//! A record moves through the protocol as follows:
//!
//! ```text
//! Genesis -> ReceiverNotRegistered | RecvAddrFailed | RecvAddrConfirmed
//! RecvAddrConfirmed -> RecvAddrConfirmationPassed -> NetConfirmed
//! {RecvAddrConfirmed, RecvAddrConfirmationPassed, NetConfirmed}
//!     -> SenderConfirmed | SenderConfirmationfailed
//! SenderConfirmed -> TxSubmissionPassed | FailedToSubmitTxn
//! ```
//!
//! Any non-terminal record can be reverted. `TxSubmissionPassed`,
//! `FailedToSubmitTxn` and `Reverted` are terminal: nothing changes them.
//!
//! Every mutator borrows the record and returns an updated copy, so a
//! rejected operation leaves the caller's record untouched.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TransferError};
use crate::payload::CallPayload;
use crate::types::{Chain, Token};
use crate::wire;

/// Where a transfer stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TxStatus {
    Genesis,
    ReceiverNotRegistered,
    RecvAddrFailed,
    RecvAddrConfirmed,
    RecvAddrConfirmationPassed,
    NetConfirmed,
    SenderConfirmed,
    SenderConfirmationfailed,
    TxSubmissionPassed { hash: String },
    FailedToSubmitTxn { reason: String },
    Reverted { reason: String },
    TxError { detail: String },
}

/// A status without its payload, for comparisons and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusTag {
    Genesis,
    ReceiverNotRegistered,
    RecvAddrFailed,
    RecvAddrConfirmed,
    RecvAddrConfirmationPassed,
    NetConfirmed,
    SenderConfirmed,
    SenderConfirmationfailed,
    TxSubmissionPassed,
    FailedToSubmitTxn,
    Reverted,
    TxError,
}

impl TxStatus {
    pub fn tag(&self) -> StatusTag {
        match self {
            TxStatus::Genesis => StatusTag::Genesis,
            TxStatus::ReceiverNotRegistered => StatusTag::ReceiverNotRegistered,
            TxStatus::RecvAddrFailed => StatusTag::RecvAddrFailed,
            TxStatus::RecvAddrConfirmed => StatusTag::RecvAddrConfirmed,
            TxStatus::RecvAddrConfirmationPassed => StatusTag::RecvAddrConfirmationPassed,
            TxStatus::NetConfirmed => StatusTag::NetConfirmed,
            TxStatus::SenderConfirmed => StatusTag::SenderConfirmed,
            TxStatus::SenderConfirmationfailed => StatusTag::SenderConfirmationfailed,
            TxStatus::TxSubmissionPassed { .. } => StatusTag::TxSubmissionPassed,
            TxStatus::FailedToSubmitTxn { .. } => StatusTag::FailedToSubmitTxn,
            TxStatus::Reverted { .. } => StatusTag::Reverted,
            TxStatus::TxError { .. } => StatusTag::TxError,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.tag().is_terminal()
    }
}

impl StatusTag {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusTag::TxSubmissionPassed | StatusTag::FailedToSubmitTxn | StatusTag::Reverted
        )
    }

    /// The receiver has attested ownership of the address and the sender
    /// has not yet decided.
    pub fn is_receiver_confirmed(&self) -> bool {
        matches!(
            self,
            StatusTag::RecvAddrConfirmed
                | StatusTag::RecvAddrConfirmationPassed
                | StatusTag::NetConfirmed
        )
    }
}

/// Parameters the sender supplies to start a transfer.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub tx_nonce: u32,
    pub sender_address: String,
    pub receiver_address: String,
    pub sender_address_network: Chain,
    pub receiver_address_network: Chain,
    pub amount: U256,
    pub token: Token,
    pub code_word: String,
}

/// The authoritative record of one transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStateMachine {
    pub tx_nonce: u32,
    pub sender_address: String,
    pub receiver_address: String,
    pub sender_address_network: Chain,
    pub receiver_address_network: Chain,
    #[serde(with = "wire::u256_dec")]
    pub amount: U256,
    pub token: Token,
    pub code_word: String,
    /// Estimated network fee in the native asset, for display.
    #[serde(default)]
    pub fees_amount: f64,
    /// Protocol fee in the native asset, for display.
    #[serde(default)]
    pub vane_fees_amount: f64,
    #[serde(default)]
    pub call_payload: Option<CallPayload>,
    #[serde(default, with = "wire::opt_bytes")]
    pub signed_call_payload: Option<Vec<u8>>,
    #[serde(default, with = "wire::opt_bytes")]
    pub recv_signature: Option<Vec<u8>>,
    pub status: TxStatus,
    /// Set while a broadcast is in flight.
    #[serde(default)]
    pub submission_pending: bool,
}

impl TxStateMachine {
    /// Start a transfer in `Genesis`.
    pub fn initiate(req: NewTransfer) -> Result<Self> {
        if req.amount.is_zero() {
            return Err(TransferError::Validation("amount must be > 0".into()));
        }
        req.sender_address_network
            .validate_address(&req.sender_address)?;
        req.receiver_address_network
            .validate_address(&req.receiver_address)?;

        let record = Self {
            tx_nonce: req.tx_nonce,
            sender_address: req.sender_address,
            receiver_address: req.receiver_address,
            sender_address_network: req.sender_address_network,
            receiver_address_network: req.receiver_address_network,
            amount: req.amount,
            token: req.token,
            code_word: req.code_word,
            fees_amount: 0.0,
            vane_fees_amount: 0.0,
            call_payload: None,
            signed_call_payload: None,
            recv_signature: None,
            status: TxStatus::Genesis,
            submission_pending: false,
        };
        record.validate()?;

        info!(
            tx_nonce = record.tx_nonce,
            network = %record.sender_address_network,
            "transfer initiated"
        );
        Ok(record)
    }

    /// Structural invariants that hold in every state.
    pub fn validate(&self) -> Result<()> {
        let token_chain = self.token.chain();
        if token_chain != self.sender_address_network {
            return Err(TransferError::TokenNetworkMismatch {
                token: token_chain,
                network: self.sender_address_network,
            });
        }

        if let Some(payload) = &self.call_payload {
            if payload.chain() != self.sender_address_network {
                return Err(TransferError::Validation(format!(
                    "call payload is for {}, sender network is {}",
                    payload.chain(),
                    self.sender_address_network
                )));
            }
        }

        if self.signed_call_payload.is_some() && self.call_payload.is_none() {
            return Err(TransferError::Validation(
                "signed payload without a call payload".into(),
            ));
        }

        Ok(())
    }

    pub fn status_tag(&self) -> StatusTag {
        self.status.tag()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // ── Field setters ────────────────────────────────────────────────

    /// Store the receiver's address-ownership signature.
    pub fn set_receiver_signature(&self, signature: Vec<u8>) -> Result<Self> {
        self.require(StatusTag::Genesis, "set receiver signature")?;
        if signature.is_empty() {
            return Err(TransferError::Validation("empty receiver signature".into()));
        }

        let mut next = self.clone();
        next.recv_signature = Some(signature);
        Ok(next)
    }

    /// Attach the prepared unsigned transaction.
    pub fn set_call_payload(&self, payload: CallPayload) -> Result<Self> {
        self.require_live("set call payload")?;
        if self.signed_call_payload.is_some() {
            return Err(TransferError::transition(
                self.status_tag(),
                "replace a call payload that is already signed",
            ));
        }
        if payload.chain() != self.sender_address_network {
            return Err(TransferError::Validation(format!(
                "call payload is for {}, sender network is {}",
                payload.chain(),
                self.sender_address_network
            )));
        }
        payload.check_transfer(
            &self.sender_address,
            &self.receiver_address,
            self.amount,
            &self.token,
        )?;

        let mut next = self.clone();
        next.call_payload = Some(payload);
        Ok(next)
    }

    /// Store the wallet's signature over the call payload.
    pub fn set_signed_call_payload(&self, signature: Vec<u8>) -> Result<Self> {
        self.require_live("set signed call payload")?;
        if self.call_payload.is_none() {
            return Err(TransferError::Validation(
                "cannot sign before a call payload is set".into(),
            ));
        }

        let mut next = self.clone();
        next.signed_call_payload = Some(signature);
        Ok(next)
    }

    pub fn set_fees_amount(&self, fees: f64) -> Result<Self> {
        self.require_live("set fees")?;
        check_fee(fees)?;

        let mut next = self.clone();
        next.fees_amount = fees;
        Ok(next)
    }

    pub fn set_vane_fees_amount(&self, fees: f64) -> Result<Self> {
        self.require_live("set protocol fees")?;
        check_fee(fees)?;

        let mut next = self.clone();
        next.vane_fees_amount = fees;
        Ok(next)
    }

    /// Mark a broadcast as in flight.
    pub fn set_submission_pending(&self) -> Result<Self> {
        self.require(StatusTag::SenderConfirmed, "start submission")?;
        if self.signed_call_payload.is_none() {
            return Err(TransferError::Validation(
                "cannot submit without a signed payload".into(),
            ));
        }

        let mut next = self.clone();
        next.submission_pending = true;
        Ok(next)
    }

    // ── Receiver transitions ─────────────────────────────────────────

    pub fn receiver_not_registered(&self) -> Result<Self> {
        self.require(StatusTag::Genesis, "mark receiver not registered")?;
        Ok(self.with_status(TxStatus::ReceiverNotRegistered))
    }

    pub fn recv_addr_failed(&self) -> Result<Self> {
        self.require(StatusTag::Genesis, "fail receiver confirmation")?;
        Ok(self.with_status(TxStatus::RecvAddrFailed))
    }

    /// The receiver attested ownership of its address.
    pub fn recv_addr_confirmed(&self) -> Result<Self> {
        self.require(StatusTag::Genesis, "confirm receiver address")?;
        if self.recv_signature.is_none() {
            return Err(TransferError::Validation(
                "receiver confirmation requires a receiver signature".into(),
            ));
        }
        Ok(self.with_status(TxStatus::RecvAddrConfirmed))
    }

    /// The relay verified the receiver's attestation.
    pub fn recv_addr_confirmation_passed(&self) -> Result<Self> {
        self.require(StatusTag::RecvAddrConfirmed, "pass receiver confirmation")?;
        Ok(self.with_status(TxStatus::RecvAddrConfirmationPassed))
    }

    /// Sender and receiver agree on the network.
    pub fn net_confirmed(&self) -> Result<Self> {
        self.require(StatusTag::RecvAddrConfirmationPassed, "confirm network")?;
        if self.sender_address_network != self.receiver_address_network {
            return Err(TransferError::Validation(format!(
                "sender network {} differs from receiver network {}",
                self.sender_address_network, self.receiver_address_network
            )));
        }
        Ok(self.with_status(TxStatus::NetConfirmed))
    }

    // ── Sender transitions ───────────────────────────────────────────

    /// The sender signed the prepared transaction.
    pub fn sender_confirmed(&self) -> Result<Self> {
        self.require_receiver_confirmed("confirm as sender")?;
        if self.signed_call_payload.is_none() {
            return Err(TransferError::Validation(
                "sender confirmation requires a signed payload".into(),
            ));
        }
        Ok(self.with_status(TxStatus::SenderConfirmed))
    }

    pub fn sender_confirmation_failed(&self) -> Result<Self> {
        self.require_receiver_confirmed("fail sender confirmation")?;
        Ok(self.with_status(TxStatus::SenderConfirmationfailed))
    }

    // ── Terminal transitions ─────────────────────────────────────────

    /// Record a successful broadcast. Repeating the same call is a no-op.
    pub fn set_tx_submission_passed(&self, hash: String) -> Result<Self> {
        if let TxStatus::TxSubmissionPassed { hash: existing } = &self.status {
            if *existing == hash {
                return Ok(self.clone());
            }
        }
        self.require(StatusTag::SenderConfirmed, "record submission success")?;

        let mut next = self.with_status(TxStatus::TxSubmissionPassed { hash });
        next.submission_pending = false;
        Ok(next)
    }

    /// Record a failed broadcast. Repeating the same call is a no-op.
    pub fn set_tx_submission_failed(&self, reason: String) -> Result<Self> {
        if let TxStatus::FailedToSubmitTxn { reason: existing } = &self.status {
            if *existing == reason {
                return Ok(self.clone());
            }
        }
        self.require(StatusTag::SenderConfirmed, "record submission failure")?;

        let mut next = self.with_status(TxStatus::FailedToSubmitTxn { reason });
        next.submission_pending = false;
        Ok(next)
    }

    /// Abandon the transfer. Allowed from any non-terminal status.
    pub fn revert(&self, reason: String) -> Result<Self> {
        if let TxStatus::Reverted { reason: existing } = &self.status {
            if *existing == reason {
                return Ok(self.clone());
            }
        }
        self.require_live("revert")?;

        let mut next = self.with_status(TxStatus::Reverted { reason });
        next.submission_pending = false;
        Ok(next)
    }

    /// Record a processing fault without ending the transfer.
    pub fn set_tx_error(&self, detail: String) -> Result<Self> {
        self.require_live("record an error")?;
        Ok(self.with_status(TxStatus::TxError { detail }))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn with_status(&self, status: TxStatus) -> Self {
        debug!(
            tx_nonce = self.tx_nonce,
            from = ?self.status_tag(),
            to = ?status.tag(),
            "status transition"
        );
        let mut next = self.clone();
        next.status = status;
        next
    }

    fn require(&self, expected: StatusTag, operation: &'static str) -> Result<()> {
        if self.status_tag() != expected {
            return Err(TransferError::transition(self.status_tag(), operation));
        }
        Ok(())
    }

    fn require_live(&self, operation: &'static str) -> Result<()> {
        if self.is_terminal() {
            return Err(TransferError::transition(self.status_tag(), operation));
        }
        Ok(())
    }

    fn require_receiver_confirmed(&self, operation: &'static str) -> Result<()> {
        if !self.status_tag().is_receiver_confirmed() {
            return Err(TransferError::transition(self.status_tag(), operation));
        }
        Ok(())
    }
}

fn check_fee(fees: f64) -> Result<()> {
    if !fees.is_finite() || fees < 0.0 {
        return Err(TransferError::Validation(format!("invalid fee amount {fees}")));
    }
    Ok(())
}
