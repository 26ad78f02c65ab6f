//! Bulk catalog replacement.
//!
//! A session sequences `SYNC_START` (erase, then acknowledge with
//! `REQ_SYNC`), any number of `SYNC_DATA` records written at consecutive
//! indices, and `SYNC_END`, which commits the header only when the
//! host's count matches what was stored. A mismatched or abandoned
//! session leaves the catalog empty rather than half valid.
//!
//! While a session runs the terminal is parked in `Syncing`, and the
//! state it was in beforehand is restored when the session closes.
use crate::{
    config::{MAX_RECORDS, PROGRESS_INTERVAL},
    devices::{
        catalog::Catalog,
        protocol::{
            reply::{Alarm, Reply},
            ProductData,
        },
        terminal::{StateRegister, TerminalState},
    },
    error::Error,
    hal::{flash::BlockDevice, serial, time::Tick},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum SessionState {
    Idle,
    /// Erasing. Only observable from within `on_sync_start`.
    SyncStarting,
    SyncReceiving,
}

pub struct SyncSession {
    state: SessionState,
    expected: u32,
    received: u32,
}

impl Default for SyncSession {
    fn default() -> Self { Self::new() }
}

/// Every handler returns `Err` only when a reply could not be sent.
/// Catalog failures are turned into alarms and never escape.
impl SyncSession {
    pub const fn new() -> Self { Self { state: SessionState::Idle, expected: 0, received: 0 } }

    pub fn state(&self) -> SessionState { self.state }

    pub fn is_idle(&self) -> bool { self.state == SessionState::Idle }

    /// Records stored so far in the running session.
    pub fn received(&self) -> u32 { self.received }

    pub fn on_sync_start<F, S>(
        &mut self,
        expected_count: u32,
        catalog: &mut Catalog<F>,
        terminal: &mut StateRegister<'_>,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        F: BlockDevice,
        Error: From<F::Error>,
        S: serial::Write,
    {
        if !self.is_idle() {
            log_warn!("[Sync] Start rejected, a session is already running");
            return Reply::Alarm(Alarm::BusySyncing).send(serial);
        }

        log_info!("[Sync] Starting. Expecting {} items", expected_count);
        if expected_count as usize > MAX_RECORDS {
            log_warn!("[Sync] Only {} items fit the catalog", MAX_RECORDS as u32);
        }
        terminal.transition(TerminalState::Syncing);
        self.state = SessionState::SyncStarting;
        self.expected = expected_count;
        self.received = 0;

        if catalog.erase_all().is_err() {
            log_error!("[Sync] Erase failed, session aborted");
            self.close(terminal);
            return Reply::Alarm(Alarm::WriteFailed).send(serial);
        }

        self.state = SessionState::SyncReceiving;
        Reply::RequestSync.send(serial)
    }

    pub fn on_sync_data<F, S>(
        &mut self,
        data: &ProductData,
        catalog: &mut Catalog<F>,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        F: BlockDevice,
        Error: From<F::Error>,
        S: serial::Write,
    {
        if self.state != SessionState::SyncReceiving {
            log_warn!("[Sync] Record outside of a session ignored");
            return Ok(());
        }

        let id = match data.id {
            Some(id) => id,
            None => {
                log_warn!("[Sync] Record with invalid id skipped");
                return Reply::Alarm(Alarm::InvalidId).send(serial);
            }
        };

        if catalog.write_record(self.received, id, data.price, &data.name).is_err() {
            log_error!("[Sync] Record {} could not be stored", self.received);
            return Reply::Alarm(Alarm::WriteFailed).send(serial);
        }

        self.received += 1;
        if self.received % PROGRESS_INTERVAL == 0 {
            log_info!("[Sync] Progress: {}/{}", self.received, self.expected);
        }
        Ok(())
    }

    pub fn on_sync_end<F, S>(
        &mut self,
        reported_count: u32,
        now: Tick,
        catalog: &mut Catalog<F>,
        terminal: &mut StateRegister<'_>,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        F: BlockDevice,
        Error: From<F::Error>,
        S: serial::Write,
    {
        if self.state != SessionState::SyncReceiving {
            log_warn!("[Sync] End outside of a session ignored");
            return Ok(());
        }

        log_info!("[Sync] End. Received {}, host reports {}", self.received, reported_count);
        let received = self.received;
        self.close(terminal);

        if reported_count != received {
            log_error!("[Sync] Count mismatch, catalog left empty");
            return Reply::Alarm(Alarm::SyncMismatch).send(serial);
        }

        match catalog.commit_metadata(received, now.0) {
            Ok(()) => {
                log_info!("[Sync] Catalog updated");
                Ok(())
            }
            Err(_) => {
                log_error!("[Sync] Header commit failed");
                Reply::Alarm(Alarm::WriteFailed).send(serial)
            }
        }
    }

    fn close(&mut self, terminal: &mut StateRegister<'_>) {
        self.state = SessionState::Idle;
        terminal.restore();
    }
}
