use crate::bio::sequence::SequenceRecord;
use crate::OdbError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending, space1},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Parse a FASTA header line. OrthoDB headers separate the id from the
/// description with a tab, so any run of blanks ends the id.
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        space1,
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, (id, description)))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (mut rest, _) = opt(line_ending)(rest)?;
        if rest.len() == remaining.len() {
            // lone '\r'
            rest = &rest[1..];
        }

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

fn parse_record(input: &[u8]) -> IResult<&[u8], SequenceRecord> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut record = SequenceRecord::new(id, sequence);
    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        record = record.with_description(desc.trim().to_string());
    }
    Ok((input, record))
}

/// Parse FASTA from a byte buffer. Records without residues are kept so that
/// aligned output with all-gap rows still round-trips row by row.
pub fn parse_fasta_bytes(buffer: &[u8]) -> Result<Vec<SequenceRecord>, OdbError> {
    let mut input = buffer;
    let mut records = Vec::new();

    while !input.is_empty() {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }

        if input.is_empty() {
            break;
        }

        if input[0] != b'>' {
            return Err(OdbError::Parse(
                "FASTA data must start with a '>' header line".to_string(),
            ));
        }

        match parse_record(input) {
            Ok((remaining, record)) => {
                if record.id.is_empty() {
                    return Err(OdbError::Parse("FASTA header without an id".to_string()));
                }
                records.push(record);
                input = remaining;
            }
            Err(e) => {
                return Err(OdbError::Parse(format!("Failed to parse FASTA: {:?}", e)));
            }
        }
    }

    Ok(records)
}

/// Parse FASTA from a stream, holding one record's text at a time
pub fn parse_fasta_reader<R: BufRead>(mut reader: R) -> Result<Vec<SequenceRecord>, OdbError> {
    let mut records = Vec::new();
    let mut chunk: Vec<u8> = Vec::new();
    let mut line: Vec<u8> = Vec::new();

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        let at_header = line.first() == Some(&b'>');
        if (read == 0 || at_header) && !chunk.is_empty() {
            records.extend(parse_fasta_bytes(&chunk)?);
            chunk.clear();
        }
        if read == 0 {
            break;
        }
        chunk.extend_from_slice(&line);
    }

    Ok(records)
}

/// Parse a FASTA file into records (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceRecord>, OdbError> {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let file = File::open(path)?;
        parse_fasta_reader(BufReader::new(GzDecoder::new(file)))
    } else {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }
        let mmap = unsafe { Mmap::map(&file)? };
        parse_fasta_bytes(&mmap[..])
    }
}

/// Write records to a FASTA file (supports .gz compression)
pub fn write_fasta<P: AsRef<Path>>(path: P, records: &[&SequenceRecord]) -> Result<(), OdbError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = path.as_ref();
    let file = File::create(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_fasta_to_writer(&mut writer, records)?;
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_fasta_to_writer(&mut writer, records)?;
        writer.flush()?;
    }

    Ok(())
}

/// Write records to any writer in 80-column lines
pub fn write_fasta_to_writer<W: Write>(
    writer: &mut W,
    records: &[&SequenceRecord],
) -> Result<(), OdbError> {
    for record in records {
        writeln!(writer, "{}", record.header())?;
        for chunk in record.sequence.chunks(80) {
            writeln!(writer, "{}", String::from_utf8_lossy(chunk))?;
        }
    }
    Ok(())
}
