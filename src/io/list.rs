//! Fixed-layout list files.
//!
//! Every list starts with a one-line header
//! `// mesh-decompose <class> <object> format=<ascii|binary>`, followed by
//! the entry count on its own line and the entries between `(` and `)`.
//! ASCII entries are one per line; binary entries are little-endian records.
//! Faces use the compact `n(a b c)` form in ASCII and `n a b c` label
//! records in binary.

use crate::config::WriteFormat;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::face::Vec3;
use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::io::{BufRead, Read, Write};
use std::mem::size_of;

const HEADER_TAG: &str = "mesh-decompose";
/// Most entries reserved ahead of reading them.
const PREALLOC_LIMIT: usize = 4096;

pub const LABEL_CLASS: &str = "labelList";
pub const VECTOR_CLASS: &str = "vectorField";
pub const FACE_CLASS: &str = "faceCompactList";

/// One `i64` label, stored little-endian.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct LabelRecord {
    pub value_le: i64,
}

impl LabelRecord {
    pub fn of(v: i64) -> Self {
        Self { value_le: v.to_le() }
    }
    pub fn get(&self) -> i64 {
        i64::from_le(self.value_le)
    }
}

/// One point, stored as three little-endian `f64` bit patterns.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PointRecord {
    pub bits_le: [u64; 3],
}

impl PointRecord {
    pub fn of(p: Vec3) -> Self {
        Self {
            bits_le: p.map(|x| x.to_bits().to_le()),
        }
    }
    pub fn get(&self) -> Vec3 {
        self.bits_le.map(|b| f64::from_bits(u64::from_le(b)))
    }
}

static_assertions::assert_eq_size!(LabelRecord, i64);
static_assertions::assert_eq_size!(PointRecord, [f64; 3]);
static_assertions::assert_eq_align!(PointRecord, u64);

/// Parsed list header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListHeader {
    pub class: String,
    pub object: String,
    pub format: WriteFormat,
}

impl ListHeader {
    pub fn new(class: &str, object: &str, format: WriteFormat) -> Self {
        Self {
            class: class.to_owned(),
            object: object.to_owned(),
            format,
        }
    }

    pub fn parse(line: &str, source: &str) -> Result<Self, MeshDecomposeError> {
        let bad = || MeshDecomposeError::parse(source, format!("malformed header `{}`", line.trim()));
        let mut parts = line.split_whitespace();
        if parts.next() != Some("//") || parts.next() != Some(HEADER_TAG) {
            return Err(bad());
        }
        let class = parts.next().ok_or_else(bad)?;
        let object = parts.next().ok_or_else(bad)?;
        let format = match parts.next() {
            Some("format=ascii") => WriteFormat::Ascii,
            Some("format=binary") => WriteFormat::Binary,
            _ => return Err(bad()),
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self::new(class, object, format))
    }
}

impl fmt::Display for ListHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match self.format {
            WriteFormat::Ascii => "ascii",
            WriteFormat::Binary => "binary",
        };
        write!(f, "// {HEADER_TAG} {} {} format={format}", self.class, self.object)
    }
}

fn write_open<W: Write>(w: &mut W, header: &ListHeader, n: usize) -> std::io::Result<()> {
    writeln!(w, "{header}")?;
    writeln!(w, "{n}")?;
    writeln!(w, "(")
}

fn write_close<W: Write>(w: &mut W, format: WriteFormat) -> std::io::Result<()> {
    if format == WriteFormat::Binary {
        writeln!(w)?;
    }
    writeln!(w, ")")?;
    w.flush()
}

struct ListReader<R> {
    reader: R,
    source: String,
}

impl<R: BufRead> ListReader<R> {
    fn new(reader: R, source: &str) -> Self {
        Self {
            reader,
            source: source.to_owned(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> MeshDecomposeError {
        MeshDecomposeError::parse(self.source.clone(), reason)
    }

    /// Next non-blank line, trimmed.
    fn next_line(&mut self) -> Result<String, MeshDecomposeError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(self.error("unexpected end of file"));
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_owned());
            }
        }
    }

    /// `n` binary records. The count comes from the file, so it bounds the
    /// read but never sizes an allocation up front.
    fn read_records<T: Pod>(&mut self, n: usize) -> Result<Vec<T>, MeshDecomposeError> {
        let size = size_of::<T>();
        let total = n
            .checked_mul(size)
            .ok_or_else(|| self.error(format!("entry count {n} is too large")))?;
        let mut buf = Vec::with_capacity(total.min(PREALLOC_LIMIT * size));
        (&mut self.reader)
            .take(u64::try_from(total).unwrap_or(u64::MAX))
            .read_to_end(&mut buf)?;
        if buf.len() < total {
            return Err(self.error(format!(
                "binary block of {} bytes, expected {total}",
                buf.len()
            )));
        }
        Ok(buf.chunks_exact(size).map(bytemuck::pod_read_unaligned::<T>).collect())
    }

    fn read_label_records(&mut self, n: usize) -> Result<Vec<i64>, MeshDecomposeError> {
        Ok(self
            .read_records::<LabelRecord>(n)?
            .into_iter()
            .map(|r| r.get())
            .collect())
    }

    /// Header, count and opening parenthesis.
    fn open(&mut self, class: &str) -> Result<(ListHeader, usize), MeshDecomposeError> {
        let line = self.next_line()?;
        let header = ListHeader::parse(&line, &self.source)?;
        if header.class != class {
            return Err(self.error(format!("expected a {class}, found a {}", header.class)));
        }
        let line = self.next_line()?;
        let n = line
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid entry count `{line}`")))?;
        if self.next_line()? != "(" {
            return Err(self.error("missing `(`"));
        }
        Ok((header, n))
    }

    fn close(&mut self) -> Result<(), MeshDecomposeError> {
        match self.next_line()?.as_str() {
            ")" => Ok(()),
            other => Err(self.error(format!("expected `)`, found `{other}`"))),
        }
    }

    fn parse_label(&self, raw: &str) -> Result<i64, MeshDecomposeError> {
        raw.parse::<i64>()
            .map_err(|_| self.error(format!("invalid label `{raw}`")))
    }
}

/// Write a list of signed labels.
pub fn write_labels<W: Write>(
    mut w: W,
    object: &str,
    values: &[i64],
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    write_open(&mut w, &ListHeader::new(LABEL_CLASS, object, format), values.len())?;
    match format {
        WriteFormat::Ascii => {
            for v in values {
                writeln!(w, "{v}")?;
            }
        }
        WriteFormat::Binary => {
            let recs: Vec<LabelRecord> = values.iter().map(|&v| LabelRecord::of(v)).collect();
            w.write_all(bytemuck::cast_slice(&recs))?;
        }
    }
    write_close(&mut w, format)?;
    Ok(())
}

/// Read a list of signed labels. `source` names the input in errors.
pub fn read_labels<R: BufRead>(
    r: R,
    source: &str,
) -> Result<(ListHeader, Vec<i64>), MeshDecomposeError> {
    let mut lr = ListReader::new(r, source);
    let (header, n) = lr.open(LABEL_CLASS)?;
    let values = match header.format {
        WriteFormat::Ascii => (0..n)
            .map(|_| {
                let line = lr.next_line()?;
                lr.parse_label(&line)
            })
            .collect::<Result<Vec<_>, _>>()?,
        WriteFormat::Binary => lr.read_label_records(n)?,
    };
    lr.close()?;
    Ok((header, values))
}

pub fn write_points<W: Write>(
    mut w: W,
    object: &str,
    points: &[Vec3],
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    write_open(&mut w, &ListHeader::new(VECTOR_CLASS, object, format), points.len())?;
    match format {
        WriteFormat::Ascii => {
            for [x, y, z] in points {
                writeln!(w, "({x} {y} {z})")?;
            }
        }
        WriteFormat::Binary => {
            let recs: Vec<PointRecord> = points.iter().map(|&p| PointRecord::of(p)).collect();
            w.write_all(bytemuck::cast_slice(&recs))?;
        }
    }
    write_close(&mut w, format)?;
    Ok(())
}

pub fn read_points<R: BufRead>(
    r: R,
    source: &str,
) -> Result<(ListHeader, Vec<Vec3>), MeshDecomposeError> {
    let mut lr = ListReader::new(r, source);
    let (header, n) = lr.open(VECTOR_CLASS)?;
    let points = match header.format {
        WriteFormat::Ascii => {
            let mut points = Vec::with_capacity(n.min(PREALLOC_LIMIT));
            for _ in 0..n {
                let line = lr.next_line()?;
                let inner = line
                    .strip_prefix('(')
                    .and_then(|s| s.strip_suffix(')'))
                    .ok_or_else(|| lr.error(format!("malformed vector `{line}`")))?;
                let coords = inner
                    .split_whitespace()
                    .map(|c| c.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| lr.error(format!("invalid coordinate in `{line}`")))?;
                let p: Vec3 = coords
                    .try_into()
                    .map_err(|_| lr.error(format!("expected 3 components in `{line}`")))?;
                points.push(p);
            }
            points
        }
        WriteFormat::Binary => {
            lr.read_records::<PointRecord>(n)?
                .into_iter()
                .map(|r| r.get())
                .collect()
        }
    };
    lr.close()?;
    Ok((header, points))
}

pub fn write_faces<W: Write>(
    mut w: W,
    object: &str,
    faces: &[Vec<usize>],
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    write_open(&mut w, &ListHeader::new(FACE_CLASS, object, format), faces.len())?;
    match format {
        WriteFormat::Ascii => {
            for face in faces {
                let labels = itertools::join(face, " ");
                writeln!(w, "{}({labels})", face.len())?;
            }
        }
        WriteFormat::Binary => {
            let recs: Vec<LabelRecord> = faces
                .iter()
                .flat_map(|f| std::iter::once(f.len()).chain(f.iter().copied()))
                .map(|v| LabelRecord::of(v as i64))
                .collect();
            w.write_all(bytemuck::cast_slice(&recs))?;
        }
    }
    write_close(&mut w, format)?;
    Ok(())
}

pub fn read_faces<R: BufRead>(
    r: R,
    source: &str,
) -> Result<(ListHeader, Vec<Vec<usize>>), MeshDecomposeError> {
    let mut lr = ListReader::new(r, source);
    let (header, n) = lr.open(FACE_CLASS)?;
    let to_label = |lr: &ListReader<R>, v: i64| {
        usize::try_from(v).map_err(|_| lr.error(format!("negative point label {v}")))
    };
    let mut faces = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        let face = match header.format {
            WriteFormat::Ascii => {
                let line = lr.next_line()?;
                let (count, rest) = line
                    .split_once('(')
                    .ok_or_else(|| lr.error(format!("malformed face `{line}`")))?;
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| lr.error(format!("malformed face `{line}`")))?;
                let count = count
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| lr.error(format!("invalid face size in `{line}`")))?;
                let face = inner
                    .split_whitespace()
                    .map(|raw| to_label(&lr, lr.parse_label(raw)?))
                    .collect::<Result<Vec<_>, _>>()?;
                if face.len() != count {
                    return Err(lr.error(format!("face `{line}` declares {count} points")));
                }
                face
            }
            WriteFormat::Binary => {
                let count = lr.read_label_records(1)?[0];
                let count = to_label(&lr, count)?;
                lr.read_label_records(count)?
                    .into_iter()
                    .map(|v| to_label(&lr, v))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        faces.push(face);
    }
    lr.close()?;
    Ok((header, faces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip() {
        let h = ListHeader::new(LABEL_CLASS, "cellProcAddressing", WriteFormat::Binary);
        let line = h.to_string();
        assert_eq!(line, "// mesh-decompose labelList cellProcAddressing format=binary");
        assert_eq!(ListHeader::parse(&line, "x").unwrap(), h);
        assert!(ListHeader::parse("// other labelList a format=ascii", "x").is_err());
    }

    #[test]
    fn ascii_labels_layout() {
        let mut buf = Vec::new();
        write_labels(&mut buf, "owner", &[3, -1, 0], WriteFormat::Ascii).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(
            text,
            "// mesh-decompose labelList owner format=ascii\n3\n(\n3\n-1\n0\n)\n"
        );
        let (_, back) = read_labels(Cursor::new(buf), "owner").unwrap();
        assert_eq!(back, vec![3, -1, 0]);
    }

    #[test]
    fn binary_lists_are_exact() {
        let labels = vec![i64::MIN, -7, 0, 42, i64::MAX];
        let mut buf = Vec::new();
        write_labels(&mut buf, "l", &labels, WriteFormat::Binary).unwrap();
        assert_eq!(read_labels(Cursor::new(buf), "l").unwrap().1, labels);

        let points = vec![[0.1, -2.5e-300, 1.0 / 3.0], [f64::MAX, 0.0, -0.0]];
        let mut buf = Vec::new();
        write_points(&mut buf, "points", &points, WriteFormat::Binary).unwrap();
        let back = read_points(Cursor::new(buf), "points").unwrap().1;
        assert_eq!(back.len(), 2);
        for (a, b) in back.iter().flatten().zip(points.iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn faces_in_both_formats() {
        let faces = vec![vec![0, 1, 5, 4], vec![2, 3], vec![7, 8, 9]];
        for format in [WriteFormat::Ascii, WriteFormat::Binary] {
            let mut buf = Vec::new();
            write_faces(&mut buf, "faces", &faces, format).unwrap();
            let (header, back) = read_faces(Cursor::new(buf), "faces").unwrap();
            assert_eq!(header.format, format);
            assert_eq!(back, faces);
        }
    }

    #[test]
    fn ascii_points_round_trip_bitwise() {
        let points = vec![[0.1, 0.2, 0.30000000000000004], [1e-17, -3.0, 12345.678]];
        let mut buf = Vec::new();
        write_points(&mut buf, "points", &points, WriteFormat::Ascii).unwrap();
        assert_eq!(read_points(Cursor::new(buf), "points").unwrap().1, points);
    }

    #[test]
    fn truncated_and_mislabelled_lists_are_parse_errors() {
        let err = read_labels(Cursor::new("// mesh-decompose labelList a format=ascii\n3\n(\n1\n"), "a")
            .unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }));

        let mut buf = Vec::new();
        write_faces(&mut buf, "faces", &[vec![0, 1]], WriteFormat::Ascii).unwrap();
        let err = read_labels(Cursor::new(buf), "faces").unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }));

        let err = read_faces(
            Cursor::new("// mesh-decompose faceCompactList f format=ascii\n1\n(\n3(0 1)\n)\n"),
            "f",
        )
        .unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }));
    }

    #[test]
    fn oversized_counts_are_parse_errors() {
        let mut labels = b"// mesh-decompose labelList a format=binary\n".to_vec();
        labels.extend_from_slice(format!("{}\n(\n", usize::MAX).as_bytes());
        labels.extend_from_slice(bytemuck::bytes_of(&LabelRecord::of(1)));
        let err = read_labels(Cursor::new(labels), "a").unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }), "{err:?}");

        let mut points = b"// mesh-decompose vectorField p format=binary\n".to_vec();
        points.extend_from_slice(format!("{}\n(\n", 1usize << 40).as_bytes());
        points.extend_from_slice(bytemuck::bytes_of(&PointRecord::of([1.0, 2.0, 3.0])));
        let err = read_points(Cursor::new(points), "p").unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }), "{err:?}");

        let faces = format!("// mesh-decompose faceCompactList f format=ascii\n{}\n(\n3(0 1 2)\n)\n", 1usize << 61);
        let err = read_faces(Cursor::new(faces), "f").unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }), "{err:?}");

        let mut face = b"// mesh-decompose faceCompactList f format=binary\n1\n(\n".to_vec();
        face.extend_from_slice(bytemuck::bytes_of(&LabelRecord::of(i64::MAX)));
        let err = read_faces(Cursor::new(face), "f").unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Parse { .. }), "{err:?}");
    }
}
