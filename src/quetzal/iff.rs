//! IFF (Interchange File Format) chunk framing for Quetzal files. The core
//! only ever builds/parses the in-memory byte buffer; `Host::write_file`/
//! `read_file` own the actual persistence.

use crate::error::{ZMachineError, ZResult};

pub struct IffChunk {
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

pub struct IffFile {
    pub form_type: [u8; 4],
    pub chunks: Vec<IffChunk>,
}

impl IffFile {
    pub fn new() -> Self {
        IffFile {
            form_type: *b"IFZS",
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.push(IffChunk { chunk_type, data });
    }

    pub fn find_chunk(&self, chunk_type: &[u8; 4]) -> Option<&IffChunk> {
        self.chunks.iter().find(|c| &c.chunk_type == chunk_type)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let total_size = 4 + self.chunks.iter().map(|c| 8 + c.data.len() + (c.data.len() % 2)).sum::<usize>();
        let mut out = Vec::with_capacity(8 + total_size);
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(total_size as u32).to_be_bytes());
        out.extend_from_slice(&self.form_type);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.chunk_type);
            out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&chunk.data);
            if chunk.data.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }

    pub fn from_bytes(data: &[u8]) -> ZResult<Self> {
        let err = |detail: &str| ZMachineError::StreamError { detail: detail.into() };
        if data.len() < 12 || &data[0..4] != b"FORM" {
            return Err(err("not an IFF file (missing FORM header)"));
        }
        let mut form_type = [0u8; 4];
        form_type.copy_from_slice(&data[8..12]);
        let mut iff = IffFile { form_type, chunks: Vec::new() };

        let mut pos = 12;
        while pos + 8 <= data.len() {
            let mut chunk_type = [0u8; 4];
            chunk_type.copy_from_slice(&data[pos..pos + 4]);
            let size = u32::from_be_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]) as usize;
            pos += 8;
            if pos + size > data.len() {
                return Err(err("truncated IFF chunk"));
            }
            iff.chunks.push(IffChunk {
                chunk_type,
                data: data[pos..pos + size].to_vec(),
            });
            pos += size + (size % 2);
        }
        Ok(iff)
    }
}

impl Default for IffFile {
    fn default() -> Self {
        IffFile::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_chunks() {
        let mut iff = IffFile::new();
        iff.add_chunk(*b"IFhd", vec![1, 2, 3]);
        iff.add_chunk(*b"Stks", vec![4, 5]);
        let bytes = iff.to_bytes();
        let parsed = IffFile::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.form_type, *b"IFZS");
        assert_eq!(parsed.find_chunk(b"IFhd").unwrap().data, vec![1, 2, 3]);
        assert_eq!(parsed.find_chunk(b"Stks").unwrap().data, vec![4, 5]);
    }
}
