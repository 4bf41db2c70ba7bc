//! Datacenter file storage.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Maximum disk transfer rate in MB/s used by default.
pub const DEFAULT_MAX_TRANSFER_RATE: f64 = 133.;

/// File stored in a datacenter. Size is in MB.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct File {
    pub name: String,
    pub size: u64,
}

impl File {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq, Serialize)]
pub enum StorageError {
    #[error("file name is empty")]
    InvalidName,
    #[error("file {0} already exists")]
    AlreadyExists(String),
    #[error("not enough space for file {name}: {available} MB available")]
    NotEnoughSpace { name: String, available: u64 },
    #[error("file {0} not found")]
    NotFound(String),
}

/// A trait for storages from which cloudlets read their input files.
pub trait FileStorage {
    /// Stores file and returns the time it takes.
    fn add_file(&mut self, file: File) -> Result<f64, StorageError>;

    /// Removes file and returns it.
    fn delete_file(&mut self, name: &str) -> Result<File, StorageError>;

    fn get_file(&self, name: &str) -> Option<&File>;

    /// Maximum transfer rate in MB/s.
    fn max_transfer_rate(&self) -> f64;

    fn capacity(&self) -> u64;

    fn available_space(&self) -> u64;
}

/// Storage area network: disk array accessed over a network link.
pub struct SanStorage {
    name: String,
    capacity: u64,
    used: u64,
    /// Network bandwidth in MB/s.
    bandwidth: f64,
    /// Network latency in seconds.
    network_latency: f64,
    max_transfer_rate: f64,
    files: IndexMap<String, File>,
}

impl SanStorage {
    pub fn new(name: &str, capacity: u64, bandwidth: f64, network_latency: f64) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            used: 0,
            bandwidth,
            network_latency,
            max_transfer_rate: DEFAULT_MAX_TRANSFER_RATE,
            files: IndexMap::new(),
        }
    }

    pub fn with_max_transfer_rate(mut self, rate: f64) -> Self {
        self.max_transfer_rate = rate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl FileStorage for SanStorage {
    fn add_file(&mut self, file: File) -> Result<f64, StorageError> {
        if file.name.is_empty() {
            return Err(StorageError::InvalidName);
        }
        if self.files.contains_key(&file.name) {
            return Err(StorageError::AlreadyExists(file.name));
        }
        if file.size > self.available_space() {
            return Err(StorageError::NotEnoughSpace {
                name: file.name,
                available: self.available_space(),
            });
        }
        let time = self.network_latency + file.size as f64 / self.bandwidth.min(self.max_transfer_rate);
        self.used += file.size;
        self.files.insert(file.name.clone(), file);
        Ok(time)
    }

    fn delete_file(&mut self, name: &str) -> Result<File, StorageError> {
        let file = self
            .files
            .shift_remove(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        self.used -= file.size;
        Ok(file)
    }

    fn get_file(&self, name: &str) -> Option<&File> {
        self.files.get(name)
    }

    fn max_transfer_rate(&self) -> f64 {
        self.max_transfer_rate
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn available_space(&self) -> u64 {
        self.capacity - self.used
    }
}
