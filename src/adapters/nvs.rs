//! NVS (Non-Volatile Storage) dose-record store.
//!
//! Each group's record is one blob in namespace `espresso`, key
//! `dose_g1` / `dose_g2`.  The namespace is opened read-write once at boot
//! and the handle kept for the life of the firmware; every save ends with
//! `nvs_commit`, which is atomic per blob.
//!
//! Host builds keep the two records in memory.

use crate::app::ports::{StorageError, StoragePort};
use crate::brew::GroupId;
use log::info;

#[cfg(not(target_os = "espidf"))]
use crate::brew::GROUP_COUNT;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"espresso\0";

/// NUL-terminated NVS key of a group's record.
#[cfg(target_os = "espidf")]
const fn record_key(group: GroupId) -> &'static [u8] {
    match group {
        GroupId::One => b"dose_g1\0",
        GroupId::Two => b"dose_g2\0",
    }
}

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    handle: nvs_handle_t,
    #[cfg(not(target_os = "espidf"))]
    records: [Option<Vec<u8>>; GROUP_COUNT],
}

impl NvsAdapter {
    /// Initialise NVS flash and open the dose namespace.
    ///
    /// A partition with no free pages or written by a newer IDF is erased;
    /// the machine then starts from built-in doses.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as esp_err_t
                    || unsafe { nvs_flash_init() } != ESP_OK as esp_err_t
                {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK as esp_err_t {
                return Err(StorageError::IoError);
            }

            let mut handle: nvs_handle_t = 0;
            // SAFETY: NAMESPACE is NUL-terminated and 'static.
            let ret = unsafe {
                nvs_open(
                    NAMESPACE.as_ptr() as *const _,
                    nvs_open_mode_t_NVS_READWRITE,
                    &mut handle,
                )
            };
            if ret != ESP_OK as esp_err_t {
                warn!("NVS: opening dose namespace failed ({})", ret);
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: dose namespace open");
            Ok(Self { handle })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self {
                records: Default::default(),
            })
        }
    }
}

#[cfg(target_os = "espidf")]
impl Drop for NvsAdapter {
    fn drop(&mut self) {
        // SAFETY: the handle was opened in `new` and is closed exactly once.
        unsafe { nvs_close(self.handle) };
    }
}

impl StoragePort for NvsAdapter {
    fn read_record(&self, group: GroupId, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let data = self.records[group.index()]
                .as_ref()
                .ok_or(StorageError::NotFound)?;
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Ok(len)
        }

        #[cfg(target_os = "espidf")]
        {
            let mut size = buf.len();
            // SAFETY: `buf` is valid for `size` bytes; NVS writes at most that.
            let ret = unsafe {
                nvs_get_blob(
                    self.handle,
                    record_key(group).as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret == ESP_OK as esp_err_t {
                Ok(size)
            } else if ret == ESP_ERR_NVS_NOT_FOUND as esp_err_t {
                Err(StorageError::NotFound)
            } else {
                // includes a blob longer than any record we write
                warn!("NvsAdapter: reading group {} record failed ({})", group, ret);
                Err(StorageError::IoError)
            }
        }
    }

    fn write_record(&mut self, group: GroupId, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.records[group.index()] = Some(data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: `data` is valid for `data.len()` bytes; the key is
            // NUL-terminated and 'static.
            let mut ret = unsafe {
                nvs_set_blob(
                    self.handle,
                    record_key(group).as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret == ESP_OK as esp_err_t {
                ret = unsafe { nvs_commit(self.handle) };
            }
            if ret == ESP_OK as esp_err_t {
                Ok(())
            } else if ret == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
                Err(StorageError::Full)
            } else {
                warn!("NvsAdapter: writing group {} record failed ({})", group, ret);
                Err(StorageError::IoError)
            }
        }
    }
}
