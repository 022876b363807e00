mod store;

pub use store::MemoryQuotaStore;
