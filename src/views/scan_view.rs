// src/views/scan_view.rs
//! Scan page: decoded text -> asset id -> asset record

use tracing::{debug, warn};

use crate::api::AssetApi;
use crate::error::{ClientError, ClientResult};
use crate::models::AssetRow;
use crate::scanner::{AssetId, ImageDecoder, ScanSession, ScanSource};
use crate::sequencer::{RequestSequencer, Ticket};

const LOOKUP_FAILED: &str = "Asset not found or API error.";

#[derive(Default)]
pub struct ScanView {
    session: ScanSession,
    seq: RequestSequencer,
    asset: Option<AssetRow>,
    error: Option<String>,
    loading: bool,
}

impl ScanView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&self) -> Option<&AssetRow> {
        self.asset.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Feeds one scanner result. Returns the lookup to perform, if any.
    ///
    /// Empty and repeated text is ignored. Unrecognized text sets the error
    /// without a lookup.
    pub fn on_code_result(&mut self, text: &str) -> Option<(Ticket, AssetId)> {
        let resolved = self.session.observe(text)?;
        self.error = None;
        self.asset = None;
        match resolved {
            Ok(id) => {
                self.loading = true;
                Some((self.seq.issue(), id))
            }
            Err(e) => {
                debug!(error = %e, "scan text not recognized");
                self.error = Some(e.notice());
                None
            }
        }
    }

    pub fn complete_lookup(&mut self, ticket: Ticket, result: ClientResult<AssetRow>) -> ClientResult<bool> {
        if !self.seq.accept(ticket) {
            return Ok(false);
        }
        self.loading = false;
        match result {
            Ok(asset) => {
                self.asset = Some(asset);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "asset lookup failed");
                self.error = Some(LOOKUP_FAILED.to_string());
                match e {
                    ClientError::Auth(_) => Err(e),
                    other => Err(ClientError::Network {
                        status: other.status(),
                        message: LOOKUP_FAILED.to_string(),
                    }),
                }
            }
        }
    }

    pub async fn scan_text<A: AssetApi + ?Sized>(&mut self, api: &A, text: &str) -> ClientResult<Option<&AssetRow>> {
        let Some((ticket, id)) = self.on_code_result(text) else {
            return Ok(None);
        };
        let result = api.get_asset(id).await;
        self.complete_lookup(ticket, result)?;
        Ok(self.asset.as_ref())
    }

    /// Pulls the next decoded text from a live source.
    pub async fn scan_next<A, S>(&mut self, api: &A, source: &mut S) -> ClientResult<Option<&AssetRow>>
    where
        A: AssetApi + ?Sized,
        S: ScanSource + ?Sized,
    {
        let text = source.next_text().await?;
        self.scan_text(api, &text).await
    }

    /// Still-image path: decoding failures set the image error.
    pub async fn scan_image<A, D>(&mut self, api: &A, decoder: &D, image: &[u8]) -> ClientResult<Option<&AssetRow>>
    where
        A: AssetApi + ?Sized,
        D: ImageDecoder + ?Sized,
    {
        match decoder.decode(image) {
            Ok(text) => self.scan_text(api, &text).await,
            Err(_) => {
                let err = ClientError::unreadable_image();
                self.error = Some(err.notice());
                Err(err)
            }
        }
    }

    /// Forgets the last scan so the same code can be looked up again.
    pub fn clear(&mut self) {
        self.session.clear();
        self.asset = None;
        self.error = None;
    }

    pub fn teardown(&mut self) {
        self.seq.teardown();
        self.loading = false;
    }
}
