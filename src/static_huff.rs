//! Static Huffman Compression
//!
//! Classic two pass byte compressor.  The first pass counts how often each
//! of the 256 byte values occurs, the second packs a prefix code for every
//! input byte, most significant bit first.  The frequency table is the only
//! side information in the file, the expander rebuilds the identical tree
//! from it, see the `prefix_tree` module for the merge contract.
//!
//! * This transforms streams with `Read`/`Write` + `Seek`, usually files
//! * File layout is 256 little endian u32 counts, then the packed bit
//!   stream, then one byte holding the number of zero bits that pad the
//!   final data byte (0-7)
//! * The expander validates the header against the stream length before
//!   walking any bits, a truncated or corrupted file is reported rather
//!   than expanded into garbage

use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter};
use crate::DYNERR;
use crate::tools::prefix_tree::{FreqTable,PrefixTree,CodeTable,NUM_SYMBOLS};
use crate::tools::progress::Progress;

/// size of the stored frequency table in bytes
const HEADER_SIZE: usize = 4*NUM_SYMBOLS;
/// header plus trailer, the smallest well formed compressed stream
const MIN_COMPRESSED_SIZE: u64 = HEADER_SIZE as u64 + 1;

/// Options controlling compression and diagnostics
#[derive(Clone)]
pub struct Options {
    /// dump the frequency table to stderr
    pub show_frequency_table: bool,
    /// dump the derived codes to stderr
    pub show_code_table: bool,
    /// draw progress bars on stderr during the long passes
    pub show_progress: bool,
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64,
    /// return error if file is larger
    pub max_file_size: u64
}

pub const STD_OPTIONS: Options = Options {
    show_frequency_table: false,
    show_code_table: false,
    show_progress: false,
    in_offset: 0,
    out_offset: 0,
    max_file_size: i32::MAX as u64
};

/// four value/count column pairs per row, values in hex
fn dump_freq_table(freq: &FreqTable) {
    eprintln!();
    eprintln!("Frequency Table (value, frequency):");
    for i in (0..NUM_SYMBOLS).step_by(4) {
        eprintln!("\t{:02x}\t{}\t\t{:02x}\t{}\t\t{:02x}\t{}\t\t{:02x}\t{}",
            i,freq.get(i as u8),
            i+1,freq.get((i+1) as u8),
            i+2,freq.get((i+2) as u8),
            i+3,freq.get((i+3) as u8));
    }
}

/// one value/code line per byte value
fn dump_code_table(codes: &CodeTable) {
    eprintln!();
    eprintln!("Code Table (value, code):");
    for v in 0..NUM_SYMBOLS {
        let txt: String = codes.get(v as u8).iter().map(|bit| match bit { true => '1', false => '0' }).collect();
        eprintln!("\t{:02x}\t{}",v,txt);
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(expanded_in);
    let mut writer = BufWriter::new(compressed_out);
    let mut expanded_length = reader.seek(SeekFrom::End(0))?;
    if opt.in_offset > expanded_length {
        return Err(Box::new(crate::Error::FileFormatMismatch));
    }
    expanded_length -= opt.in_offset;
    if expanded_length > opt.max_file_size {
        return Err(Box::new(crate::Error::FileTooLarge));
    }
    // first pass, every byte must be counted before any bit is packed
    log::debug!("start frequency scan");
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    let mut freq = FreqTable::new();
    let mut progress = Progress::new("Reading file:",expanded_length,opt.show_progress);
    let mut buf = [0u8;0x10000];
    let mut scanned: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n==0 {
            break;
        }
        freq.add(&buf[0..n]);
        scanned += n as u64;
        progress.update(scanned);
    }
    progress.finish();
    if opt.show_frequency_table {
        dump_freq_table(&freq);
    }
    log::debug!("build prefix tree");
    let tree = PrefixTree::build(&freq);
    let codes = tree.code_table();
    if opt.show_code_table {
        dump_code_table(&codes);
    }
    writer.seek(SeekFrom::Start(opt.out_offset))?;
    writer.write_all(&freq.to_bytes())?;
    // second pass, pack the code bits MSB first
    log::debug!("start encoding pass");
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    let mut progress = Progress::new("Compressing file:",expanded_length,opt.show_progress);
    let mut acc: u8 = 0;
    let mut free: u8 = 8;
    let mut processed: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n==0 {
            break;
        }
        for byte in &buf[0..n] {
            for bit in codes.get(*byte).iter() {
                acc <<= 1;
                if bit {
                    acc |= 1;
                }
                free -= 1;
                if free==0 {
                    writer.write_all(&[acc])?;
                    acc = 0;
                    free = 8;
                }
            }
        }
        processed += n as u64;
        progress.update(processed);
    }
    progress.finish();
    // pad the last byte with zeros and record the count in the trailer,
    // free slots can only be 8 here if no bit was ever packed
    let padding = match free {
        8 => 0,
        f => {
            writer.write_all(&[acc << f])?;
            f
        }
    };
    writer.write_all(&[padding])?;
    writer.flush()?;
    log::debug!("packed {} bytes with {} padding bits",expanded_length,padding);
    Ok((expanded_length,writer.stream_position()? - opt.out_offset))
}

/// Main expansion function.
/// `compressed_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    let mut compressed_size = reader.seek(SeekFrom::End(0))?;
    if opt.in_offset > compressed_size {
        return Err(Box::new(crate::Error::FileFormatMismatch));
    }
    compressed_size -= opt.in_offset;
    if compressed_size > opt.max_file_size {
        return Err(Box::new(crate::Error::FileTooLarge));
    }
    if compressed_size < MIN_COMPRESSED_SIZE {
        log::error!("stream cannot hold a frequency table and trailer");
        return Err(Box::new(crate::Error::MalformedHeader));
    }
    // the trailer comes first, it tells how many bits of the last data
    // byte are padding
    reader.seek(SeekFrom::End(-1))?;
    let mut byte_buf: [u8;1] = [0];
    reader.read_exact(&mut byte_buf)?;
    let padding = byte_buf[0];
    if padding > 7 {
        log::error!("padding count {} is out of range",padding);
        return Err(Box::new(crate::Error::MalformedHeader));
    }
    // stored frequency table
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    let mut header = [0u8;HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let freq = FreqTable::from_bytes(&header);
    if opt.show_frequency_table {
        dump_freq_table(&freq);
    }
    let expanded_length = freq.total();
    if expanded_length > opt.max_file_size {
        log::error!("frequency table counts more bytes than the format allows");
        return Err(Box::new(crate::Error::MalformedHeader));
    }
    // identical build as the compressor
    log::debug!("build prefix tree");
    let tree = PrefixTree::build(&freq);
    let codes = tree.code_table();
    if opt.show_code_table {
        dump_code_table(&codes);
    }
    // the data region must hold exactly the counted bits
    let data_size = compressed_size - MIN_COMPRESSED_SIZE;
    let stream_bits = codes.stream_bits(&freq);
    if data_size != (stream_bits + 7)/8 || data_size*8 - stream_bits != padding as u64 {
        log::error!("frequency table does not agree with the stream length");
        return Err(Box::new(crate::Error::MalformedHeader));
    }
    // walk the tree bit by bit, codes may span byte boundaries
    log::debug!("start decoding pass");
    writer.seek(SeekFrom::Start(opt.out_offset))?;
    let mut progress = Progress::new("Decompressing file:",data_size,opt.show_progress);
    let mut walker = tree.walker();
    let mut emitted: u64 = 0;
    for i in 0..data_size {
        reader.read_exact(&mut byte_buf)?;
        let live_bits = match i+1==data_size {
            true => 8 - padding,
            false => 8
        };
        for b in 0..live_bits {
            let bit = (byte_buf[0] >> (7-b)) & 1 > 0;
            if let Some(value) = walker.step(bit) {
                writer.write_all(&[value])?;
                emitted += 1;
            }
        }
        progress.update(i+1);
    }
    progress.finish();
    if emitted != expanded_length {
        log::error!("decoded {} bytes but the header counted {}",emitted,expanded_length);
        return Err(Box::new(crate::Error::MalformedHeader));
    }
    writer.flush()?;
    Ok((compressed_size,writer.stream_position()? - opt.out_offset))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}


// *************** TESTS *****************

#[test]
fn compression_works() {
    // counts A=2 B=1 put A one level below the root (code 1) and B below
    // that (code 01), so AAB packs to 1101 padded with four zeros
    let compressed = compress_slice(b"AAB",&STD_OPTIONS).expect("compression failed");
    let mut expected = vec![0u8;HEADER_SIZE];
    expected[4*0x41] = 2;
    expected[4*0x42] = 1;
    expected.append(&mut hex::decode("d004").unwrap());
    assert_eq!(compressed,expected);
}

#[test]
fn empty_stream() {
    let compressed = compress_slice(&[],&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,vec![0u8;HEADER_SIZE+1]);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded.len(),0);
}

#[test]
fn single_byte() {
    // the lone counted value codes to one bit, seven zeros pad the byte
    let compressed = compress_slice(&[0xff],&STD_OPTIONS).expect("compression failed");
    let mut expected = vec![0u8;HEADER_SIZE];
    expected[4*0xff] = 1;
    expected.append(&mut hex::decode("8007").unwrap());
    assert_eq!(compressed,expected);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,vec![0xff]);
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn run_of_one_symbol() {
    // one bit per input byte, 1000 bits pack to 125 bytes with no padding
    let test_data = vec![0x41;1000];
    let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed.len(),HEADER_SIZE + 125 + 1);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn all_values_once() {
    let test_data: Vec<u8> = (0..=255).collect();
    let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn alternating_pair() {
    // leaf depths come out 1 and 2, giving 3072 bits = 384 bytes exactly
    let test_data: Vec<u8> = (0..2048).map(|i| (i%2) as u8).collect();
    let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed.len(),HEADER_SIZE + 384 + 1);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn embedded_stream() {
    // streams can sit past a caller owned prefix on both sides
    let mut opt = STD_OPTIONS;
    opt.in_offset = 4;
    opt.out_offset = 4;
    let test_data = "hdr:I am Sam. Sam I am.".as_bytes();
    let compressed = compress_slice(test_data,&opt).expect("compression failed");
    let expanded = expand_slice(&compressed,&opt).expect("expansion failed");
    assert_eq!(expanded[4..],test_data[4..]);
}

#[test]
fn enforces_size_limit() {
    let mut opt = STD_OPTIONS;
    opt.max_file_size = 10;
    assert!(compress_slice(&[0u8;11],&opt).is_err());
    assert!(compress_slice(&[0u8;10],&opt).is_ok());
}

#[test]
fn detects_truncation() {
    let compressed = compress_slice(b"abracadabra",&STD_OPTIONS).expect("compression failed");
    assert!(expand_slice(&compressed[0..compressed.len()-2],&STD_OPTIONS).is_err());
    // not even room for the table
    assert!(expand_slice(&[0u8;100],&STD_OPTIONS).is_err());
}

#[test]
fn detects_tampered_trailer() {
    let mut compressed = compress_slice(b"AAB",&STD_OPTIONS).expect("compression failed");
    *compressed.last_mut().unwrap() = 9;
    assert!(expand_slice(&compressed,&STD_OPTIONS).is_err());
}

#[test]
fn detects_overflowing_header() {
    // counts that sum past the format bound cannot come from the compressor
    let mut stream = vec![0u8;HEADER_SIZE+1];
    stream[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
    stream[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(expand_slice(&stream,&STD_OPTIONS).is_err());
}
