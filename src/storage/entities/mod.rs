pub mod businesses;
pub mod call_records;
pub mod conversations;
pub mod leads;
pub mod messages;
