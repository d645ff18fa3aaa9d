use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Returns the geometric center (unweighted mean) of a set of points.
///
/// A single point is returned unchanged. Returns `None` for an empty slice.
pub fn center(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    match points {
        [] => None,
        [single] => Some(*single),
        _ => {
            let sum = points
                .iter()
                .fold(Vector3::zeros(), |acc, p| acc + p.coords);
            Some(Point3::from(sum / points.len() as f64))
        }
    }
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Returns the angle `a--b--c` at vertex `b` in degrees, in `[0, 180]`.
///
/// Uses `atan2(|v1 x v2|, v1 . v2)`, which stays accurate close to 0 and 180 degrees.
pub fn angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let v1 = a - b;
    let v2 = c - b;
    let sine = v1.cross(&v2).norm();
    let cosine = v1.dot(&v2);
    sine.atan2(cosine).to_degrees()
}

/// Returns the dihedral angle of `a--b--c--d` in degrees, in `(-180, 180]`.
///
/// For an improper dihedral pass the atoms as `a--b--c` with `d` bonded to `b`.
/// Swapping the two inner points negates the result.
pub fn dihedral(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let v1 = b - a;
    let v2 = c - b;
    let v3 = d - c;
    let n1 = v1.cross(&v2);
    let n2 = v2.cross(&v3);
    let sine = n1.dot(&v3) * v2.norm();
    let cosine = n1.dot(&n2);
    let degrees = sine.atan2(cosine).to_degrees();
    if degrees == -180.0 { 180.0 } else { degrees }
}

/// Computes the rigid transform that best superimposes `mobile` onto `target`.
///
/// Kabsch algorithm on the unweighted centroids; the returned isometry maps
/// `mobile[i]` close to `target[i]`. Returns `None` when the slices differ in
/// length, are empty, or the covariance decomposition fails.
pub fn superposition(mobile: &[Point3<f64>], target: &[Point3<f64>]) -> Option<Isometry3<f64>> {
    if mobile.len() != target.len() || mobile.is_empty() {
        return None;
    }
    let mobile_center = center(mobile)?;
    let target_center = center(target)?;

    let mut covariance = Matrix3::zeros();
    for (m, t) in mobile.iter().zip(target.iter()) {
        covariance += (m - mobile_center) * (t - target_center).transpose();
    }

    let svd = covariance.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return None,
    };
    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        let mut v_t_adj = v_t;
        v_t_adj.row_mut(2).neg_mut();
        rotation = v_t_adj.transpose() * u.transpose();
    }

    let rotation = Rotation3::from_matrix_unchecked(rotation);
    let translation = target_center.coords - rotation * mobile_center.coords;
    Some(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
