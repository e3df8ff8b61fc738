//! Face-level helpers: orientation reversal, cyclic comparison and geometry.
//!
//! A face is an ordered list of point labels. Its orientation (the direction of
//! its area vector) follows the right-hand rule over that order, and by
//! convention points out of the owner cell.

pub type Vec3 = [f64; 3];

/// Reverse the orientation of a face while keeping its first point.
///
/// `[a, b, c, d]` becomes `[a, d, c, b]`. Two-point faces (edges of an area
/// mesh) have no interior to reverse around, so their ends are swapped.
pub fn reverse_face(face: &[usize]) -> Vec<usize> {
    match face.len() {
        0 | 1 => face.to_vec(),
        2 => vec![face[1], face[0]],
        _ => {
            let mut out = Vec::with_capacity(face.len());
            out.push(face[0]);
            out.extend(face[1..].iter().rev().copied());
            out
        }
    }
}

/// Relationship between two point lists describing the same set of points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaceMatch {
    /// Same cyclic order (possibly rotated).
    Same,
    /// Reversed cyclic order (possibly rotated).
    Reversed,
    /// Different point sets or vertex counts.
    Different,
}

/// Compare two faces up to rotation and reflection of their point order.
pub fn compare_faces(a: &[usize], b: &[usize]) -> FaceMatch {
    let n = a.len();
    if n != b.len() || n == 0 {
        return FaceMatch::Different;
    }
    if n == 2 {
        return match (a[0] == b[0] && a[1] == b[1], a[0] == b[1] && a[1] == b[0]) {
            (true, _) => FaceMatch::Same,
            (_, true) => FaceMatch::Reversed,
            _ => FaceMatch::Different,
        };
    }
    let Some(start) = b.iter().position(|&p| p == a[0]) else {
        return FaceMatch::Different;
    };
    if (0..n).all(|i| a[i] == b[(start + i) % n]) {
        return FaceMatch::Same;
    }
    if (0..n).all(|i| a[i] == b[(start + n - i) % n]) {
        return FaceMatch::Reversed;
    }
    FaceMatch::Different
}

pub(crate) fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn mag(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn distance(a: Vec3, b: Vec3) -> f64 {
    mag(sub(a, b))
}

/// Arithmetic mean of the face points.
pub fn face_centre(points: &[Vec3], face: &[usize]) -> Vec3 {
    if face.is_empty() {
        return [0.0; 3];
    }
    let sum = face.iter().fold([0.0; 3], |acc, &p| add(acc, points[p]));
    scale(sum, 1.0 / face.len() as f64)
}

/// Area vector of a polygonal face (fan triangulation about the centre).
///
/// For a two-point face the result is the edge vector rotated in the plane
/// normal to `z`, which gives edges of an area mesh a length-weighted normal.
pub fn face_area_vector(points: &[Vec3], face: &[usize]) -> Vec3 {
    match face.len() {
        0 | 1 => [0.0; 3],
        2 => {
            let e = sub(points[face[1]], points[face[0]]);
            [e[1], -e[0], 0.0]
        }
        n => {
            let c = face_centre(points, face);
            let mut area = [0.0; 3];
            for i in 0..n {
                let a = sub(points[face[i]], c);
                let b = sub(points[face[(i + 1) % n]], c);
                area = add(area, cross(a, b));
            }
            scale(area, 0.5)
        }
    }
}

/// Shortest edge of a face; the characteristic length for matching tolerances.
pub fn min_edge_length(points: &[Vec3], face: &[usize]) -> f64 {
    let n = face.len();
    (0..n)
        .map(|i| distance(points[face[i]], points[face[(i + 1) % n]]))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_keeps_first_point() {
        assert_eq!(reverse_face(&[0, 1, 2, 3]), vec![0, 3, 2, 1]);
        assert_eq!(reverse_face(&[4, 7]), vec![7, 4]);
    }

    #[test]
    fn compare_detects_rotation_and_reflection() {
        assert_eq!(compare_faces(&[0, 1, 2, 3], &[2, 3, 0, 1]), FaceMatch::Same);
        assert_eq!(compare_faces(&[0, 1, 2, 3], &[0, 3, 2, 1]), FaceMatch::Reversed);
        assert_eq!(compare_faces(&[0, 1, 2, 3], &[2, 1, 0, 3]), FaceMatch::Reversed);
        assert_eq!(compare_faces(&[0, 1, 2, 3], &[0, 2, 1, 3]), FaceMatch::Different);
        assert_eq!(compare_faces(&[0, 1, 2], &[0, 1, 2, 3]), FaceMatch::Different);
    }

    #[test]
    fn unit_square_area_points_along_z() {
        let pts = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let area = face_area_vector(&pts, &[0, 1, 2, 3]);
        assert!((area[2] - 1.0).abs() < 1e-12);
        let flipped = face_area_vector(&pts, &reverse_face(&[0, 1, 2, 3]));
        assert!((flipped[2] + 1.0).abs() < 1e-12);
    }
}
