//! Definition of various test shapes.

use crate::error::Result;
use crate::surface::Surface;
use std::collections::HashMap;

/// Create a regular sphere
///
/// A regular sphere is created by starting with a regular octahedron. The shape is then refined `refinement_level` times.
/// Each time the surface is refined, each triangle is split into four triangles (by adding lines connecting the midpoints of
/// each edge). The new points are then scaled so that they are a distance of `radius` from `centre`.
///
/// The triangles are ordered anticlockwise when seen from outside, so normals point outwards.
pub fn regular_sphere(refinement_level: u32, radius: f64, centre: [f64; 3]) -> Surface {
    let mut points = Vec::<[f64; 3]>::with_capacity(2 + usize::pow(4, refinement_level + 1));
    points.push([0.0, 0.0, 1.0]);
    points.push([1.0, 0.0, 0.0]);
    points.push([0.0, 1.0, 0.0]);
    points.push([-1.0, 0.0, 0.0]);
    points.push([0.0, -1.0, 0.0]);
    points.push([0.0, 0.0, -1.0]);

    let mut cells = vec![
        [0, 1, 2],
        [0, 2, 3],
        [0, 3, 4],
        [0, 4, 1],
        [5, 2, 1],
        [5, 3, 2],
        [5, 4, 3],
        [5, 1, 4],
    ];

    for level in 0..refinement_level {
        let mut edge_points = HashMap::new();
        let mut new_cells = Vec::with_capacity(8 * usize::pow(4, level + 1));
        for c in &cells {
            let edges = [[1, 2], [0, 2], [0, 1]]
                .iter()
                .map(|[i, j]| {
                    let key = (c[*i].min(c[*j]), c[*i].max(c[*j]));
                    *edge_points.entry(key).or_insert_with(|| {
                        let (v_i, v_j) = (points[c[*i]], points[c[*j]]);
                        let mut new_pt = [
                            0.5 * (v_i[0] + v_j[0]),
                            0.5 * (v_i[1] + v_j[1]),
                            0.5 * (v_i[2] + v_j[2]),
                        ];
                        let size = new_pt.iter().map(|x| x * x).sum::<f64>().sqrt();
                        for x in new_pt.iter_mut() {
                            *x /= size;
                        }
                        points.push(new_pt);
                        points.len() - 1
                    })
                })
                .collect::<Vec<_>>();
            new_cells.push([c[0], edges[2], edges[1]]);
            new_cells.push([c[1], edges[0], edges[2]]);
            new_cells.push([c[2], edges[1], edges[0]]);
            new_cells.push([edges[0], edges[1], edges[2]]);
        }
        cells = new_cells;
    }

    let place = |p: &[f64; 3]| {
        [
            centre[0] + radius * p[0],
            centre[1] + radius * p[1],
            centre[2] + radius * p[2],
        ]
    };
    let mut surface = Surface::unnamed();
    for c in &cells {
        surface.add_triangle(place(&points[c[0]]), place(&points[c[1]]), place(&points[c[2]]));
    }
    surface
}

/// Create the surface of an axis aligned cube with the given side length, split into squares no
/// larger than `max_dim`
///
/// Faces are ordered anticlockwise when seen from outside.
pub fn cube(side: f64, centre: [f64; 3], max_dim: f64) -> Result<Surface> {
    let lo = centre.map(|c| c - 0.5 * side);
    let hi = centre.map(|c| c + 0.5 * side);
    let mut surface = Surface::unnamed();
    // (corner, first edge end, second edge end) with first x second pointing outwards
    let faces = [
        (lo, [lo[0], hi[1], lo[2]], [hi[0], lo[1], lo[2]]),
        (hi, [lo[0], hi[1], hi[2]], [hi[0], lo[1], hi[2]]),
        (lo, [hi[0], lo[1], lo[2]], [lo[0], lo[1], hi[2]]),
        (hi, [hi[0], hi[1], lo[2]], [lo[0], hi[1], hi[2]]),
        (lo, [lo[0], lo[1], hi[2]], [lo[0], hi[1], lo[2]]),
        (hi, [hi[0], lo[1], hi[2]], [hi[0], hi[1], lo[2]]),
    ];
    for (p0, p1, p2) in faces {
        surface.add_meshed_quadrilateral(p0, p1, p2, max_dim)?;
    }
    Ok(surface)
}

/// Create a flat rectangular plate in the plane `z = height`, split into squares no larger than
/// `max_dim`
pub fn plate(width: f64, length: f64, height: f64, max_dim: f64) -> Result<Surface> {
    let mut surface = Surface::unnamed();
    surface.add_meshed_quadrilateral(
        [0.0, 0.0, height],
        [width, 0.0, height],
        [0.0, length, height],
        max_dim,
    )?;
    Ok(surface)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{dot, sub, Panel};
    use approx::assert_relative_eq;

    #[test]
    fn test_regular_sphere() {
        for level in 0..3 {
            let sphere = regular_sphere(level, 2.0, [1.0, 0.0, 0.0]);
            assert_eq!(sphere.panel_count(), 8 * usize::pow(4, level));
            for polygon in sphere.polygons() {
                let panel = Panel::new(polygon, 1, 0).unwrap();
                let outward = sub(panel.centroid(), &[1.0, 0.0, 0.0]);
                assert!(dot(&outward, panel.normal()) > 0.0);
                for v in polygon {
                    let r = sub(v, &[1.0, 0.0, 0.0]);
                    assert_relative_eq!(dot(&r, &r).sqrt(), 2.0, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_cube() {
        let centre = [0.5, -1.0, 2.0];
        let surface = cube(2.0, centre, 0.5).unwrap();
        assert_eq!(surface.panel_count(), 6 * 16);
        let mut area = 0.0;
        for polygon in surface.polygons() {
            let panel = Panel::new(polygon, 1, 0).unwrap();
            assert!(dot(&sub(panel.centroid(), &centre), panel.normal()) > 0.0);
            area += panel.area();
        }
        assert_relative_eq!(area, 24.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plate() {
        let surface = plate(1.0, 2.0, 0.5, 0.5).unwrap();
        assert_eq!(surface.panel_count(), 8);
        assert!(plate(1.0, 1.0, 0.0, -1.0).is_err());
    }
}
