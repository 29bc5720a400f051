pub mod ledger;
pub mod token;
