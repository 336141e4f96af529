use crate::resource::{Attribute, AttributeData};

/// Generates the attributes of a subdivided plane.
///
/// The plane lies on the XY plane, centered at the origin, facing +Z. Rows are
/// emitted from top to bottom, so the uv `v` coordinate goes from 1 to 0.
///
/// # Arguments
/// * `width` - The plane width (extent along X axis)
/// * `height` - The plane height (extent along Y axis)
/// * `width_segments` - Number of subdivisions along the width, at least 1
/// * `height_segments` - Number of subdivisions along the height, at least 1
///
/// # Returns
/// The `position`, `normal`, `uv` and `index` attributes. The index is 16-bit
/// unless the plane has more than 65535 vertices.
pub fn plane(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> Vec<(String, Attribute)> {
    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);
    let num_vertices = ((w_segs + 1) * (h_segs + 1)) as usize;
    let num_indices = (w_segs * h_segs * 6) as usize;

    let mut position = Vec::with_capacity(num_vertices * 3);
    let mut normal = Vec::with_capacity(num_vertices * 3);
    let mut uv = Vec::with_capacity(num_vertices * 2);
    let mut index = Vec::with_capacity(num_indices);

    let seg_w = width / w_segs as f32;
    let seg_h = height / h_segs as f32;

    for iy in 0..=h_segs {
        let y = iy as f32 * seg_h - height / 2.0;
        for ix in 0..=w_segs {
            let x = ix as f32 * seg_w - width / 2.0;

            position.extend_from_slice(&[x, -y, 0.0]);
            normal.extend_from_slice(&[0.0, 0.0, 1.0]);
            uv.extend_from_slice(&[ix as f32 / w_segs as f32, 1.0 - iy as f32 / h_segs as f32]);

            if iy == h_segs || ix == w_segs {
                continue;
            }

            let a = ix + iy * (w_segs + 1);
            let b = ix + (iy + 1) * (w_segs + 1);
            let c = ix + (iy + 1) * (w_segs + 1) + 1;
            let d = ix + iy * (w_segs + 1) + 1;
            index.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    let index = if num_vertices > 65535 {
        AttributeData::U32(index)
    } else {
        AttributeData::U16(index.into_iter().map(|i| i as u16).collect())
    };

    vec![
        ("position".to_string(), Attribute::new(3, position)),
        ("normal".to_string(), Attribute::new(3, normal)),
        ("uv".to_string(), Attribute::new(2, uv)),
        ("index".to_string(), Attribute::index(index)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(attributes: &'a [(String, Attribute)], name: &str) -> &'a Attribute {
        &attributes.iter().find(|(n, _)| n == name).unwrap().1
    }

    #[test]
    fn vertex_and_index_counts() {
        let attributes = plane(1.0, 1.0, 2, 3);
        assert_eq!(find(&attributes, "position").data().len(), 3 * 12);
        assert_eq!(find(&attributes, "uv").data().len(), 2 * 12);
        assert_eq!(find(&attributes, "index").data().len(), 6 * 6);
    }

    #[test]
    fn winding_and_layout() {
        let attributes = plane(2.0, 2.0, 1, 1);
        assert_eq!(
            find(&attributes, "index").data(),
            &AttributeData::U16(vec![0, 2, 1, 2, 3, 1])
        );
        assert_eq!(
            find(&attributes, "position").data(),
            &AttributeData::F32(vec![
                -1.0, 1.0, 0.0, 1.0, 1.0, 0.0, //
                -1.0, -1.0, 0.0, 1.0, -1.0, 0.0,
            ])
        );
    }

    #[test]
    fn large_planes_use_32_bit_indices() {
        let attributes = plane(1.0, 1.0, 256, 256);
        assert_eq!(
            find(&attributes, "index").data_type(),
            crate::context::DataType::UnsignedInt
        );
    }
}
