use voucherdesk_infra::{AnyVoucherStore, ChangeFeed, NotifyingVoucherStore, VoucherService};

pub type AppVoucherService = VoucherService<NotifyingVoucherStore<AnyVoucherStore>>;

/// Shared per-process services handed to every handler.
pub struct AppServices {
    vouchers: AppVoucherService,
}

impl AppServices {
    pub fn new(store: AnyVoucherStore, change_feed_capacity: usize) -> Self {
        let feed = ChangeFeed::new(change_feed_capacity);
        Self {
            vouchers: VoucherService::new(NotifyingVoucherStore::new(store, feed)),
        }
    }

    pub fn vouchers(&self) -> &AppVoucherService {
        &self.vouchers
    }

    pub fn feed(&self) -> &ChangeFeed {
        self.vouchers.store().feed()
    }
}
