//! Message handlers, one per topic family

pub mod cdc;
pub mod dolphin;
pub mod gws;
pub mod worker;

pub use cdc::CdcHandler;
pub use dolphin::{DolphinHandler, DolphinKind};
pub use gws::{GwsMerchantBankHandler, GwsMerchantHandler, UpsertMerchantEvent};
pub use worker::WorkerHandler;
