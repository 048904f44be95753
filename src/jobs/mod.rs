pub mod price_update_sync;
