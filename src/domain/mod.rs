//! Domain layer: identifiers, accounts, verification codes, items.
//!
//! Types here carry validation and invariants but no I/O. Persistence lives
//! in [`crate::persistence`]; orchestration in [`crate::service`].

pub mod account;
pub mod credential;
pub mod email;
pub mod ids;
pub mod item;
pub mod lending;
pub mod verification_code;

pub use account::{Account, Activation, CodeReplacement, NewAccount};
pub use credential::CredentialHash;
pub use email::{AllowedDomains, EmailAddress};
pub use ids::{AccountId, ItemId, MessageId, RequestId};
pub use item::{Item, ItemPatch, ItemStatus, NewItem};
pub use lending::{BorrowingHistory, BorrowingRequest, Message, NewMessage, RetirementReport};
pub use verification_code::{IssuedCode, VerificationCode};
