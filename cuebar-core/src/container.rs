//! Cuebar snapshot container serialization and deserialization

use crate::{
    Difficulty, DisplayType, Error, Question, QuestionType, Result, Segment, SegmentId, SegmentKind, SegmentList,
    DEFAULT_QUESTION_LENGTH,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::warn;
use std::io::{Read, Write};
use std::sync::Arc;

/// Magic bytes for the snapshot format: "CUE\0"
const MAGIC: [u8; 4] = [b'C', b'U', b'E', 0];

/// Current snapshot format version
const VERSION: u16 = 1;

/// Upper bound on a single stored string, guards against corrupt length prefixes
const MAX_STRING_LEN: u32 = 1 << 20;

const KIND_PLAIN: u8 = 0;
const KIND_QUESTION: u8 = 1;

const FLAG_SHOW_WINNER: u8 = 0b01;
const FLAG_LIVE: u8 = 0b10;

/// Snapshot file header
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    /// Format version
    pub version: u16,
    /// Total edited duration in seconds, as stored
    pub total_duration: f64,
    /// Question length used for new insertions, in seconds
    pub default_length: f64,
    /// Number of segment records that follow
    pub num_segments: u32,
    /// Reference to the source video (path or URL)
    pub source_video: String,
}

impl ContainerHeader {
    /// Creates a new header for the current format version
    pub fn new(total_duration: f64, default_length: f64, num_segments: u32, source_video: impl Into<String>) -> Self {
        Self {
            version: VERSION,
            total_duration,
            default_length,
            num_segments,
            source_video: source_video.into(),
        }
    }

    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let total_duration = reader.read_f64::<LittleEndian>()?;
        let default_length = reader.read_f64::<LittleEndian>()?;
        let num_segments = reader.read_u32::<LittleEndian>()?;
        let source_video = read_string(reader)?;

        Ok(Self {
            version,
            total_duration,
            default_length,
            num_segments,
            source_video,
        })
    }

    /// Writes the header to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_f64::<LittleEndian>(self.total_duration)?;
        writer.write_f64::<LittleEndian>(self.default_length)?;
        writer.write_u32::<LittleEndian>(self.num_segments)?;
        write_string(writer, &self.source_video)?;
        Ok(())
    }
}

/// Everything persisted for one timeline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimelineSnapshot {
    pub segments: SegmentList,
    pub total_duration: f64,
    pub source_video: String,
    pub default_length: f64,
}

impl TimelineSnapshot {
    /// Creates a snapshot; the total duration is taken from the segment list
    pub fn new(segments: SegmentList, source_video: impl Into<String>, default_length: f64) -> Self {
        Self {
            total_duration: segments.total_duration(),
            segments,
            source_video: source_video.into(),
            default_length,
        }
    }

    /// Reads a snapshot from a reader, validating the segment list.
    ///
    /// A stored total that disagrees with the last segment end is replaced by
    /// the recomputed value.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let header = ContainerHeader::read(&mut reader)?;

        let mut segments = Vec::with_capacity(header.num_segments.min(4096) as usize);
        for _ in 0..header.num_segments {
            segments.push(read_segment(&mut reader)?);
        }

        let segments = SegmentList::from_segments(segments)?;
        let total_duration = segments.total_duration();
        if (total_duration - header.total_duration).abs() > 1e-6 {
            warn!(
                "stored total duration {}s disagrees with segments ({}s), using recomputed value",
                header.total_duration, total_duration
            );
        }

        let default_length = if header.default_length.is_finite() && header.default_length > 0.0 {
            header.default_length
        } else {
            warn!("invalid stored default length {}, using default", header.default_length);
            DEFAULT_QUESTION_LENGTH
        };

        Ok(Self {
            segments,
            total_duration,
            source_video: header.source_video,
            default_length,
        })
    }

    /// Writes the snapshot to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let header = ContainerHeader::new(
            self.segments.total_duration(),
            self.default_length,
            self.segments.len() as u32,
            self.source_video.clone(),
        );
        header.write(&mut writer)?;

        for segment in &self.segments {
            write_segment(&mut writer, segment)?;
        }

        Ok(())
    }
}

fn read_segment<R: Read>(reader: &mut R) -> Result<Segment> {
    let id = SegmentId::from(read_string(reader)?);
    let start = reader.read_f64::<LittleEndian>()?;
    let end = reader.read_f64::<LittleEndian>()?;
    let kind = match reader.read_u8()? {
        KIND_PLAIN => SegmentKind::Plain,
        KIND_QUESTION => SegmentKind::Question(Arc::new(read_question(reader)?)),
        value => return Err(Error::InvalidTag { field: "segment kind", value }),
    };

    Ok(Segment { id, start, end, kind })
}

fn write_segment<W: Write>(writer: &mut W, segment: &Segment) -> Result<()> {
    write_string(writer, segment.id.as_str())?;
    writer.write_f64::<LittleEndian>(segment.start)?;
    writer.write_f64::<LittleEndian>(segment.end)?;
    match &segment.kind {
        SegmentKind::Plain => writer.write_u8(KIND_PLAIN)?,
        SegmentKind::Question(question) => {
            writer.write_u8(KIND_QUESTION)?;
            write_question(writer, question)?;
        }
    }
    Ok(())
}

fn read_question<R: Read>(reader: &mut R) -> Result<Question> {
    let id = read_string(reader)?;
    let question = read_string(reader)?;
    let answers = read_strings(reader)?;
    let correct_answers = read_strings(reader)?;

    let difficulty = reader.read_u8()?;
    let difficulty = Difficulty::from_tag(difficulty).ok_or(Error::InvalidTag {
        field: "difficulty",
        value: difficulty,
    })?;
    let question_type = reader.read_u8()?;
    let question_type = QuestionType::from_tag(question_type).ok_or(Error::InvalidTag {
        field: "question type",
        value: question_type,
    })?;
    let display_type = reader.read_u8()?;
    let display_type = DisplayType::from_tag(display_type).ok_or(Error::InvalidTag {
        field: "display type",
        value: display_type,
    })?;

    let flags = reader.read_u8()?;
    let associated_tab = match reader.read_u8()? {
        0 => None,
        _ => Some(reader.read_u32::<LittleEndian>()?),
    };

    Ok(Question {
        id,
        question,
        answers,
        correct_answers,
        difficulty,
        question_type,
        display_type,
        show_winner: flags & FLAG_SHOW_WINNER != 0,
        live: flags & FLAG_LIVE != 0,
        associated_tab,
    })
}

fn write_question<W: Write>(writer: &mut W, question: &Question) -> Result<()> {
    write_string(writer, &question.id)?;
    write_string(writer, &question.question)?;
    write_strings(writer, &question.answers)?;
    write_strings(writer, &question.correct_answers)?;
    writer.write_u8(question.difficulty.tag())?;
    writer.write_u8(question.question_type.tag())?;
    writer.write_u8(question.display_type.tag())?;

    let mut flags = 0;
    if question.show_winner {
        flags |= FLAG_SHOW_WINNER;
    }
    if question.live {
        flags |= FLAG_LIVE;
    }
    writer.write_u8(flags)?;

    match question.associated_tab {
        Some(tab) => {
            writer.write_u8(1)?;
            writer.write_u32::<LittleEndian>(tab)?;
        }
        None => writer.write_u8(0)?,
    }
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(Error::InvalidString);
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::InvalidString)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_strings<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let count = reader.read_u32::<LittleEndian>()?;
    (0..count).map(|_| read_string(reader)).collect()
}

fn write_strings<W: Write>(writer: &mut W, values: &[String]) -> Result<()> {
    writer.write_u32::<LittleEndian>(values.len() as u32)?;
    for value in values {
        write_string(writer, value)?;
    }
    Ok(())
}
