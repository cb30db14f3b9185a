use std::future::Future;
use std::time::Duration;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::device::radio::{Radio, ScanStream};
use crate::device::types::DeviceIdentity;
use crate::error::DeviceError;

/// Owns the radio and runs name-filtered scans. At most one scan is expected to be in flight;
/// the controller's state machine guarantees that.
pub struct BleLink<R: Radio> {
    radio: R,
    scan_cancel: CancellationToken,
}

async fn first_match<P: Send + 'static>(advertisements: &mut ScanStream<P>, name_filter: &str) -> Result<DeviceIdentity<P>, DeviceError> {
    while let Some(advertisement) = advertisements.next().await {
        let identity = advertisement?;

        // Some platforms ignore the filter, so make sure to check the name again
        if identity.name() == name_filter {
            return Ok(identity);
        }

        debug!("Ignoring advertisement from {}", identity.name());
    }

    // the platform stopped reporting advertisements; keep waiting for the deadline
    futures::future::pending().await
}

impl<R: Radio> BleLink<R> {
    pub fn new(radio: R) -> Self {
        BleLink {
            radio,
            scan_cancel: CancellationToken::new(),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub async fn is_adapter_enabled(&self) -> bool {
        self.radio.is_adapter_enabled().await
    }

    /// Build a scan that resolves with the first peripheral advertising `name_filter`, or with
    /// [`DeviceError::ScanTimeout`] once `deadline` passes. The platform scan is stopped on every
    /// outcome, including [`BleLink::cancel_scan`].
    pub fn scan(&mut self, name_filter: &str, deadline: Duration) -> impl Future<Output = Result<DeviceIdentity<R::Peripheral>, DeviceError>> + Send + 'static {
        self.scan_cancel.cancel();
        self.scan_cancel = CancellationToken::new();

        let cancel = self.scan_cancel.clone();
        let radio = self.radio.clone();
        let name_filter = name_filter.to_string();

        async move {
            info!("Scanning for {}...", name_filter);
            let mut advertisements = radio.start_scan(&name_filter).await?;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(DeviceError::ScanCancelled),
                result = timeout(deadline, first_match(&mut advertisements, &name_filter)) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DeviceError::ScanTimeout),
                },
            };

            drop(advertisements);
            if let Err(err) = radio.stop_scan().await {
                warn!("Failed to stop scanning: {}", err);
            }

            match &outcome {
                Ok(identity) => info!("Found {}", identity.name()),
                Err(err) => info!("Scan ended: {}", err),
            }
            outcome
        }
    }

    pub fn cancel_scan(&self) {
        self.scan_cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::{EXPECTED_DEVICE_NAME, SCAN_TIMEOUT};
    use crate::device::fake::FakeRadio;

    #[tokio::test(start_paused = true)]
    async fn should_return_first_matching_advertisement() {
        let radio = FakeRadio::new();
        radio.advertise("Some_Headphones");
        radio.advertise(EXPECTED_DEVICE_NAME);
        radio.advertise(EXPECTED_DEVICE_NAME);

        let mut link = BleLink::new(radio.clone());
        let identity = link.scan(EXPECTED_DEVICE_NAME, SCAN_TIMEOUT).await.unwrap();

        assert_eq!(identity.name(), EXPECTED_DEVICE_NAME);
        assert_eq!(identity.into_peripheral().id, 1);
        let calls = radio.calls();
        assert_eq!(calls.start_scan, 1);
        assert_eq!(calls.stop_scan, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_without_match() {
        let radio = FakeRadio::new();
        radio.advertise("Some_Headphones");

        let mut link = BleLink::new(radio.clone());
        let started = tokio::time::Instant::now();
        let result = link.scan(EXPECTED_DEVICE_NAME, SCAN_TIMEOUT).await;

        assert!(matches!(result, Err(DeviceError::ScanTimeout)));
        assert!(started.elapsed() >= SCAN_TIMEOUT);
        assert_eq!(radio.calls().stop_scan, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_platform_scan_failure() {
        let radio = FakeRadio::new();
        radio.fail_scan(2);

        let mut link = BleLink::new(radio.clone());
        let result = link.scan(EXPECTED_DEVICE_NAME, SCAN_TIMEOUT).await;

        assert!(matches!(result, Err(DeviceError::ScanFailed(2))));
        assert_eq!(radio.calls().stop_scan, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_scan_when_cancelled() {
        let radio = FakeRadio::new();
        let mut link = BleLink::new(radio.clone());
        let scan = tokio::spawn(link.scan(EXPECTED_DEVICE_NAME, SCAN_TIMEOUT));

        tokio::task::yield_now().await;
        link.cancel_scan();

        let result = scan.await.unwrap();
        assert!(matches!(result, Err(DeviceError::ScanCancelled)));
        assert_eq!(radio.calls().stop_scan, 1);
    }
}
