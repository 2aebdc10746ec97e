//! Device adapter over the SQLite tables
//!
//! [`Device`] answers the [`platform`](crate::platform) traits from the
//! database, refusing any capability the configuration has not granted.

use super::Database;
use crate::config::Permissions;
use crate::error::Result;
use crate::platform::{
    ContactDirectory, LocationSource, MessageStore, Permission, SmsQuery, WifiSource,
};
use crate::types::{Location, LocationProvider, SmsRow};
use std::sync::Arc;

/// Permission-gated view of the device tables
pub struct Device {
    db: Arc<Database>,
    permissions: Permissions,
}

impl Device {
    pub fn new(db: Arc<Database>, permissions: Permissions) -> Self {
        Self { db, permissions }
    }
}

impl MessageStore for Device {
    fn query(&self, query: &SmsQuery) -> Result<Vec<SmsRow>> {
        self.permissions.require(Permission::ReadSms)?;
        self.db.query_sms(query)
    }

    fn mark_read(&self, id: &str) -> Result<usize> {
        self.permissions.require(Permission::ReadSms)?;
        self.db.mark_sms_read(id)
    }

    fn delete(&self, id: &str) -> Result<usize> {
        self.permissions.require(Permission::ReadSms)?;
        self.db.delete_sms(id)
    }

    fn count_unread(&self) -> Result<usize> {
        self.permissions.require(Permission::ReadSms)?;
        self.db.count_unread_sms()
    }
}

impl ContactDirectory for Device {
    fn display_name(&self, identifier: &str) -> Result<Option<String>> {
        self.permissions.require(Permission::ReadContacts)?;
        self.db.lookup_contact(identifier)
    }
}

impl WifiSource for Device {
    fn ssid(&self) -> Result<Option<String>> {
        self.permissions.require(Permission::Wifi)?;
        self.db.wifi_ssid()
    }
}

impl LocationSource for Device {
    fn last_known(&self, provider: LocationProvider) -> Result<Option<Location>> {
        self.permissions.require(Permission::Location)?;
        self.db.location_fix(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewSms;
    use crate::error::Error;
    use crate::platform::SmsFilter;

    fn test_db() -> Arc<Database> {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        Arc::new(db)
    }

    #[test]
    fn test_granted_device_reads_tables() {
        let db = test_db();
        db.insert_sms(&NewSms::incoming("+1", "hi", 1, 1)).unwrap();
        db.upsert_contact("+1", Some("One")).unwrap();
        db.set_wifi_ssid(Some("Cafe")).unwrap();

        let device = Device::new(db, Permissions::default());
        let rows = device
            .query(&SmsQuery::newest(SmsFilter::All, None))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(device.display_name("+1").unwrap().as_deref(), Some("One"));
        assert_eq!(device.ssid().unwrap().as_deref(), Some("Cafe"));
        assert_eq!(device.count_unread().unwrap(), 1);
    }

    #[test]
    fn test_denied_device_reports_permission() {
        let db = test_db();
        db.insert_sms(&NewSms::incoming("+1", "hi", 1, 1)).unwrap();
        let device = Device::new(db.clone(), Permissions::none());

        assert!(matches!(
            device.query(&SmsQuery::by_thread()),
            Err(Error::PermissionDenied(Permission::ReadSms))
        ));
        assert!(matches!(
            device.delete("1"),
            Err(Error::PermissionDenied(Permission::ReadSms))
        ));
        assert!(matches!(
            device.display_name("+1"),
            Err(Error::PermissionDenied(Permission::ReadContacts))
        ));
        assert!(matches!(
            device.ssid(),
            Err(Error::PermissionDenied(Permission::Wifi))
        ));
        assert!(matches!(
            device.last_known(LocationProvider::Gps),
            Err(Error::PermissionDenied(Permission::Location))
        ));
        // Nothing was removed
        assert_eq!(db.count_unread_sms().unwrap(), 1);
    }
}
