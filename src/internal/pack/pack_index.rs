//! Builder for the companion `.idx` file: a sorted-by-id table of
//! (object id, CRC32, offset) tuples enabling random access into the pack.
//!
//! Chunks stream out through a `tokio::sync::mpsc` channel so the caller can
//! pipe the index to disk or a network peer without buffering it whole.

use tokio::sync::mpsc;

use crate::errors::PackError;
use crate::hash::{HashKind, ObjectHash, get_hash_kind};
use crate::internal::pack::index_entry::IndexEntry;
use crate::utils::HashAlgorithm;

pub struct IdxBuilder {
    sender: Option<mpsc::Sender<Vec<u8>>>,
    inner_hash: HashAlgorithm, // seals the idx trailer
    object_number: usize,
    pack_hash: ObjectHash,
    version: u32,
}

impl IdxBuilder {
    /// `version` 0 selects the oldest format compatible with the current
    /// hash kind: v2 for SHA-1, v3 for SHA-256.
    pub fn new(object_number: usize, sender: mpsc::Sender<Vec<u8>>, pack_hash: ObjectHash) -> Self {
        Self::with_version(object_number, sender, pack_hash, 0)
    }

    pub fn with_version(
        object_number: usize,
        sender: mpsc::Sender<Vec<u8>>,
        pack_hash: ObjectHash,
        version: u32,
    ) -> Self {
        let version = if version == 0 {
            match get_hash_kind() {
                HashKind::Sha1 => 2,
                HashKind::Sha256 => 3,
            }
        } else {
            version
        };
        Self {
            sender: Some(sender),
            inner_hash: HashAlgorithm::new(),
            object_number,
            pack_hash,
            version,
        }
    }

    pub fn drop_sender(&mut self) {
        self.sender.take(); // Take the sender out, dropping it
    }

    async fn send_data(&mut self, data: Vec<u8>) -> Result<(), PackError> {
        if let Some(sender) = &self.sender {
            self.inner_hash.update(&data);
            sender.send(data).await.map_err(|e| {
                PackError::IOError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    format!("Failed to send idx data: {e}"),
                ))
            })?;
        }
        Ok(())
    }

    async fn send_data_without_update_hash(&mut self, data: Vec<u8>) -> Result<(), PackError> {
        if let Some(sender) = &self.sender {
            sender.send(data).await.map_err(|e| {
                PackError::IOError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    format!("Failed to send idx data: {e}"),
                ))
            })?;
        }
        Ok(())
    }

    async fn send_u32(&mut self, v: u32) -> Result<(), PackError> {
        self.send_data(v.to_be_bytes().to_vec()).await
    }

    async fn send_u64(&mut self, v: u64) -> Result<(), PackError> {
        self.send_data(v.to_be_bytes().to_vec()).await
    }

    /// v2 header: magic + version. v3 additionally carries the header size,
    /// object count, and the number of object formats in the index.
    async fn write_header(&mut self) -> Result<(), PackError> {
        match self.version {
            2 => {
                // magic: FF 74 4F 63  version=2
                let header: [u8; 8] = [0xFF, 0x74, 0x4F, 0x63, 0, 0, 0, 2];
                self.send_data(header.to_vec()).await
            }
            3 => {
                let magic: [u8; 4] = [0xFF, 0x74, 0x4F, 0x63];
                let header_size: u32 = 20; // magic(4) + version(4) + header_size(4) + object_count(4) + format_count(4)
                let format_count: u32 = 1; // one pack never mixes hash kinds

                self.send_data(magic.to_vec()).await?;
                self.send_u32(self.version).await?;
                self.send_u32(header_size).await?;
                self.send_u32(self.object_number as u32).await?;
                self.send_u32(format_count).await
            }
            v => Err(PackError::ConversionError(format!(
                "unsupported index version {v}"
            ))),
        }
    }

    /// Cumulative counts of objects whose id starts with each byte 0x00-0xFF.
    async fn write_fanout(&mut self, entries: &mut Vec<IndexEntry>) -> Result<(), PackError> {
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        let mut fanout = [0u32; 256];
        for entry in entries.iter() {
            fanout[entry.hash.to_data()[0] as usize] += 1;
        }
        for i in 1..256 {
            fanout[i] += fanout[i - 1];
        }
        // send all 256 cumulative counts (including index 0)
        for count in fanout {
            self.send_u32(count).await?;
        }
        Ok(())
    }

    async fn write_names(&mut self, entries: &Vec<IndexEntry>) -> Result<(), PackError> {
        for e in entries {
            self.send_data(e.hash.to_data().clone()).await?;
        }

        Ok(())
    }

    async fn write_crc32(&mut self, entries: &Vec<IndexEntry>) -> Result<(), PackError> {
        for e in entries {
            self.send_u32(e.crc32).await?;
        }

        Ok(())
    }

    async fn write_offsets(&mut self, entries: &Vec<IndexEntry>) -> Result<(), PackError> {
        let mut large = vec![];
        for e in entries {
            if e.offset <= 0x7FFF_FFFF {
                // normal 31-bit offset
                self.send_u32(e.offset as u32).await?;
            } else {
                // MSB=1 => index into the trailing 64-bit offset table
                let marker = 0x8000_0000 | large.len() as u32;
                self.send_u32(marker).await?;
                large.push(e.offset);
            }
        }
        for v in large {
            self.send_u64(v).await?;
        }
        Ok(())
    }

    async fn write_trailer(&mut self) -> Result<(), PackError> {
        // pack hash
        self.send_data_without_update_hash(self.pack_hash.to_data().clone())
            .await?;

        let idx_hash = self.inner_hash.clone().finalize();
        // idx file hash
        self.send_data(idx_hash).await?;
        Ok(())
    }

    pub async fn write_idx(&mut self, mut entries: Vec<IndexEntry>) -> Result<(), PackError> {
        // check entries length
        if entries.len() != self.object_number {
            return Err(PackError::ConversionError(format!(
                "entries length {} != object_number {}",
                entries.len(),
                self.object_number
            )));
        }

        // write header
        self.write_header().await?;
        self.write_fanout(&mut entries).await?;
        self.write_names(&entries).await?;
        self.write_crc32(&entries).await?;
        self.write_offsets(&entries).await?;
        self.write_trailer().await?;
        self.drop_sender();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::errors::PackError;
    use crate::hash::{HashKind, ObjectHash, set_hash_kind_for_test};
    use crate::internal::pack::index_entry::IndexEntry;
    use crate::internal::pack::pack_index::IdxBuilder;

    fn fake_sha1(n: u8) -> ObjectHash {
        ObjectHash::Sha1([n; 20])
    }

    /// Entries with ids 0, 1, 2... so the fanout is easy to predict.
    fn build_entries_sha1(n: usize) -> Vec<IndexEntry> {
        (0..n)
            .map(|i| IndexEntry {
                hash: fake_sha1(i as u8),
                crc32: 0x12345678 + i as u32,
                offset: 0x10 + (i as u64) * 3,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_idx_builder_sha1_basic() -> Result<(), PackError> {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(4096);

        let object_number = 3;
        let pack_hash = fake_sha1(0xAA);

        let mut builder = IdxBuilder::new(object_number, tx, pack_hash);

        let entries = build_entries_sha1(object_number);
        builder.write_idx(entries).await?;

        let mut out: Vec<u8> = Vec::new();
        while let Some(chunk) = rx.recv().await {
            out.extend_from_slice(&chunk);
        }

        // ------- header -------
        // .idx v2 magic: FF 74 4F 63 00000002
        assert_eq!(&out[0..8], &[0xFF, 0x74, 0x4F, 0x63, 0, 0, 0, 2]);

        // ------- fanout -------
        // 256 * 4 bytes of cumulative counts starting at offset 8
        let fanout_start = 8;
        let fanout_end = fanout_start + 256 * 4;
        let fanout_bytes = &out[fanout_start..fanout_end];

        // Ids start with bytes 0, 1, 2, so fanout[0]=1 fanout[1]=2 and 3 after.
        let mut fanout = [3u32; 256];
        fanout[0] = 1;
        fanout[1] = 2;
        fanout[2] = 3;

        for (i, expected) in fanout.iter().enumerate() {
            let idx = i * 4;
            let v = u32::from_be_bytes([
                fanout_bytes[idx],
                fanout_bytes[idx + 1],
                fanout_bytes[idx + 2],
                fanout_bytes[idx + 3],
            ]);
            assert_eq!(v, *expected, "fanout mismatch at index {i}");
        }

        // ------- names -------
        let names_start = fanout_end;
        let names_end = names_start + object_number * 20; // sha1 = 20 bytes
        let names_bytes = &out[names_start..names_end];

        for i in 0..object_number {
            let name = &names_bytes[i * 20..i * 20 + 20];
            assert!(name.iter().all(|b| *b == i as u8));
        }

        // ------- crc32 -------
        let crc_start = names_end;
        let crc_end = crc_start + object_number * 4;
        let crc_bytes = &out[crc_start..crc_end];

        for i in 0..object_number {
            let expected = 0x12345678 + i as u32;
            let actual = u32::from_be_bytes([
                crc_bytes[4 * i],
                crc_bytes[4 * i + 1],
                crc_bytes[4 * i + 2],
                crc_bytes[4 * i + 3],
            ]);
            assert_eq!(expected, actual);
        }

        // ------- offsets -------
        let offset_start = crc_end;
        let offset_end = offset_start + object_number * 4;
        let offsets_bytes = &out[offset_start..offset_end];

        for i in 0..object_number {
            let expected = 0x10 + (i as u64) * 3;
            let actual = u32::from_be_bytes([
                offsets_bytes[i * 4],
                offsets_bytes[i * 4 + 1],
                offsets_bytes[i * 4 + 2],
                offsets_bytes[i * 4 + 3],
            ]);
            assert_eq!(expected as u32, actual);
        }

        // ------- pack hash -------
        let trailer_pack_hash_start = offset_end;
        let trailer_pack_hash_end = trailer_pack_hash_start + 20;
        let pack_hash_bytes = &out[trailer_pack_hash_start..trailer_pack_hash_end];
        assert!(pack_hash_bytes.iter().all(|b| *b == 0xAA));

        // ------- idx hash (present and of the right width) -------
        let idx_hash = &out[trailer_pack_hash_end..trailer_pack_hash_end + 20];
        assert_eq!(idx_hash.len(), 20);
        assert_eq!(out.len(), trailer_pack_hash_end + 20);

        Ok(())
    }

    #[tokio::test]
    async fn test_large_offsets_spill_to_64bit_table() -> Result<(), PackError> {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(4096);

        let entries = vec![
            IndexEntry {
                hash: fake_sha1(1),
                crc32: 1,
                offset: 12,
            },
            IndexEntry {
                hash: fake_sha1(2),
                crc32: 2,
                offset: 0x1_0000_0000,
            },
        ];

        let mut builder = IdxBuilder::new(2, tx, fake_sha1(0xBB));
        builder.write_idx(entries).await?;

        let mut out: Vec<u8> = Vec::new();
        while let Some(chunk) = rx.recv().await {
            out.extend_from_slice(&chunk);
        }

        let offsets_start = 8 + 256 * 4 + 2 * 20 + 2 * 4;
        let o1 = u32::from_be_bytes(out[offsets_start..offsets_start + 4].try_into().unwrap());
        let o2 = u32::from_be_bytes(out[offsets_start + 4..offsets_start + 8].try_into().unwrap());
        assert_eq!(o1, 12);
        assert_eq!(o2, 0x8000_0000); // marker pointing at spill slot 0

        let spill = u64::from_be_bytes(
            out[offsets_start + 8..offsets_start + 16].try_into().unwrap(),
        );
        assert_eq!(spill, 0x1_0000_0000);
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_count_mismatch_rejected() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let (tx, _rx) = mpsc::channel::<Vec<u8>>(16);
        let mut builder = IdxBuilder::new(5, tx, fake_sha1(0));
        let err = builder.write_idx(build_entries_sha1(3)).await.unwrap_err();
        assert!(matches!(err, PackError::ConversionError(_)));
    }
}
