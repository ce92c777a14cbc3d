//! Domain module
//!
//! Two worked examples, [`ledger::Ledger`] and
//! [`family_account::FamilyAccount`]. Neither is part of the runtime's
//! public contract in its own right -- they exist to exercise
//! [`crate::aggregate`], [`crate::store`], and [`crate::factory`] the way a
//! real caller would.

pub mod amount;
pub mod family_account;
pub mod ledger;

pub use amount::{Amount, AmountError, Balance};
pub use family_account::{CreateAccountCommand, FamilyAccount, FamilyAccountEvent, Kid};
pub use ledger::{
    CreateLedgerCommand, CreditLedgerCommand, DebitLedgerCommand, Ledger, LedgerError, LedgerEvent,
};
