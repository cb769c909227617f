use crate::common::{PageId, Result, SiltError, PAGE_SIZE};

// Header page layout: a record count followed by fixed-width records.
// Each record is a nul-padded index name and the index's root page id.
const RECORD_COUNT_OFFSET: usize = 0;
const RECORDS_OFFSET: usize = 4;

const NAME_SIZE: usize = 32;
const RECORD_SIZE: usize = NAME_SIZE + 4;

/// Maximum number of (name, root_page_id) records the directory can hold.
pub const HEADER_PAGE_CAPACITY: usize = (PAGE_SIZE - RECORDS_OFFSET) / RECORD_SIZE;

/// Mutable view over the header page: the persistent directory mapping
/// each index name to its current root page id. Lives at HEADER_PAGE_ID.
pub struct HeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn init(&mut self) {
        self.data.fill(0);
    }

    pub fn num_records(&self) -> usize {
        read_count(self.data)
    }

    fn set_num_records(&mut self, count: usize) {
        self.data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4]
            .copy_from_slice(&(count as u32).to_le_bytes());
    }

    /// Adds a new (name, root_page_id) record.
    /// Returns false if a record with this name already exists or the
    /// directory is full.
    pub fn insert_record(&mut self, name: &str, root_page_id: PageId) -> Result<bool> {
        let name_bytes = encode_name(name)?;
        if find_record(self.data, &name_bytes).is_some() {
            return Ok(false);
        }

        let count = self.num_records();
        if count >= HEADER_PAGE_CAPACITY {
            return Err(SiltError::HeaderDirectoryFull);
        }

        let offset = record_offset(count);
        self.data[offset..offset + NAME_SIZE].copy_from_slice(&name_bytes);
        self.data[offset + NAME_SIZE..offset + RECORD_SIZE]
            .copy_from_slice(&root_page_id.as_u32().to_le_bytes());
        self.set_num_records(count + 1);
        Ok(true)
    }

    /// Updates the root page id of an existing record.
    /// Returns false if no record with this name exists.
    pub fn update_record(&mut self, name: &str, root_page_id: PageId) -> Result<bool> {
        let name_bytes = encode_name(name)?;
        match find_record(self.data, &name_bytes) {
            Some(index) => {
                let offset = record_offset(index);
                self.data[offset + NAME_SIZE..offset + RECORD_SIZE]
                    .copy_from_slice(&root_page_id.as_u32().to_le_bytes());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes a record, compacting the remaining ones.
    /// Returns false if no record with this name exists.
    pub fn delete_record(&mut self, name: &str) -> Result<bool> {
        let name_bytes = encode_name(name)?;
        match find_record(self.data, &name_bytes) {
            Some(index) => {
                let count = self.num_records();
                let start = record_offset(index + 1);
                let end = record_offset(count);
                self.data.copy_within(start..end, record_offset(index));
                self.set_num_records(count - 1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_root_id(&self, name: &str) -> Result<Option<PageId>> {
        let name_bytes = encode_name(name)?;
        Ok(find_record(self.data, &name_bytes).map(|index| read_root_id(self.data, index)))
    }
}

/// Read-only view over the header page.
pub struct HeaderPageRef<'a> {
    data: &'a [u8],
}

impl<'a> HeaderPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn num_records(&self) -> usize {
        read_count(self.data)
    }

    pub fn get_root_id(&self, name: &str) -> Result<Option<PageId>> {
        let name_bytes = encode_name(name)?;
        Ok(find_record(self.data, &name_bytes).map(|index| read_root_id(self.data, index)))
    }
}

fn record_offset(index: usize) -> usize {
    RECORDS_OFFSET + index * RECORD_SIZE
}

fn read_count(data: &[u8]) -> usize {
    let bytes: [u8; 4] = data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4]
        .try_into()
        .unwrap();
    u32::from_le_bytes(bytes) as usize
}

fn read_root_id(data: &[u8], index: usize) -> PageId {
    let offset = record_offset(index) + NAME_SIZE;
    let bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
    PageId::new(u32::from_le_bytes(bytes))
}

fn find_record(data: &[u8], name_bytes: &[u8; NAME_SIZE]) -> Option<usize> {
    (0..read_count(data)).find(|&index| {
        let offset = record_offset(index);
        &data[offset..offset + NAME_SIZE] == &name_bytes[..]
    })
}

fn encode_name(name: &str) -> Result<[u8; NAME_SIZE]> {
    let raw = name.as_bytes();
    if raw.len() > NAME_SIZE {
        return Err(SiltError::IndexNameTooLong(name.to_string()));
    }
    let mut bytes = [0u8; NAME_SIZE];
    bytes[..raw.len()].copy_from_slice(raw);
    Ok(bytes)
}
