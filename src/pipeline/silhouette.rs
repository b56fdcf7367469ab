use rayon::prelude::*;

use crate::{
    error::PipelineError,
    types::{DepthSpacePoint, NO_BODY},
};

/// Masks a BGRA color image down to the pixels owned by a tracked body.
///
/// `color` holds one 4-byte pixel per entry of `projection`. `body_index`
/// holds one label per depth pixel of a `depth_width` x `depth_height` image.
/// Every write lands on the color pixel being visited; the projected depth
/// coordinate is only ever used to read `body_index`.
pub fn composite_silhouette(
    color: &mut [u8],
    projection: &[DepthSpacePoint],
    body_index: &[u8],
    depth_width: u32,
    depth_height: u32,
) -> Result<(), PipelineError> {
    PipelineError::check_len("projection points", color.len() / 4, projection.len())?;
    PipelineError::check_len("color bytes", projection.len() * 4, color.len())?;
    PipelineError::check_len(
        "body index map",
        depth_width as usize * depth_height as usize,
        body_index.len(),
    )?;

    color
        .par_chunks_exact_mut(4)
        .zip(projection.par_iter())
        .for_each(|(pixel, point)| {
            if !owned_by_body(point, body_index, depth_width, depth_height) {
                pixel.fill(0);
            }
        });

    Ok(())
}

/// Nearest depth pixel for a projection point, if it lands inside the image.
pub fn nearest_depth_pixel(point: &DepthSpacePoint, width: u32, height: u32) -> Option<(u32, u32)> {
    if point.is_unmapped() {
        return None;
    }

    let dx = (point.x + 0.5).floor();
    let dy = (point.y + 0.5).floor();
    // NaN fails both comparisons.
    let inside = dx >= 0.0 && dx < width as f32 && dy >= 0.0 && dy < height as f32;
    inside.then(|| (dx as u32, dy as u32))
}

fn owned_by_body(point: &DepthSpacePoint, body_index: &[u8], width: u32, height: u32) -> bool {
    let Some((dx, dy)) = nearest_depth_pixel(point, width, height) else {
        return false;
    };
    let depth_index = dy as usize * width as usize + dx as usize;
    body_index
        .get(depth_index)
        .is_some_and(|&label| label != NO_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_pixels(count: usize) -> Vec<u8> {
        (0..count)
            .flat_map(|i| {
                let v = (i as u8 + 1) * 10;
                [v, v + 1, v + 2, 255]
            })
            .collect()
    }

    #[test]
    fn two_by_two_grid_keeps_labelled_pixels() {
        let mut color = color_pixels(4);
        let original = color.clone();
        let projection = [
            DepthSpacePoint::new(0.0, 0.0),
            DepthSpacePoint::new(1.0, 0.0),
            DepthSpacePoint::new(0.0, 1.0),
            DepthSpacePoint::new(1.0, 1.0),
        ];
        let labels = [NO_BODY, 3, NO_BODY, 3];

        composite_silhouette(&mut color, &projection, &labels, 2, 2).unwrap();

        assert_eq!(&color[0..4], &[0, 0, 0, 0]);
        assert_eq!(&color[4..8], &original[4..8]);
        assert_eq!(&color[8..12], &[0, 0, 0, 0]);
        assert_eq!(&color[12..16], &original[12..16]);
    }

    #[test]
    fn unmapped_points_are_cleared() {
        let mut color = color_pixels(2);
        let projection = [
            DepthSpacePoint::UNMAPPED,
            DepthSpacePoint::new(f32::NEG_INFINITY, 0.0),
        ];

        composite_silhouette(&mut color, &projection, &[0], 1, 1).unwrap();

        assert!(color.iter().all(|&b| b == 0));
    }

    #[test]
    fn out_of_range_points_are_cleared() {
        let mut color = color_pixels(5);
        let projection = [
            DepthSpacePoint::new(-0.6, 0.0),
            DepthSpacePoint::new(1.5, 0.0),
            DepthSpacePoint::new(0.0, 1.5),
            DepthSpacePoint::new(f32::NAN, 0.0),
            DepthSpacePoint::new(f32::INFINITY, 0.0),
        ];

        composite_silhouette(&mut color, &projection, &[1, 1], 2, 1).unwrap();

        assert!(color.iter().all(|&b| b == 0));
    }

    #[test]
    fn rounds_to_nearest_depth_pixel() {
        assert_eq!(nearest_depth_pixel(&DepthSpacePoint::new(0.49, 0.5), 2, 2), Some((0, 1)));
        assert_eq!(nearest_depth_pixel(&DepthSpacePoint::new(-0.5, 0.0), 2, 2), Some((0, 0)));
        assert_eq!(nearest_depth_pixel(&DepthSpacePoint::new(-0.51, 0.0), 2, 2), None);
        assert_eq!(nearest_depth_pixel(&DepthSpacePoint::new(1.49, 1.49), 2, 2), Some((1, 1)));
    }

    #[test]
    fn rejects_mismatched_inputs_without_writing() {
        let mut color = color_pixels(2);
        let original = color.clone();

        let short_projection = [DepthSpacePoint::UNMAPPED];
        assert!(composite_silhouette(&mut color, &short_projection, &[0], 1, 1).is_err());

        let projection = [DepthSpacePoint::UNMAPPED; 2];
        assert!(composite_silhouette(&mut color, &projection, &[0, 0], 1, 1).is_err());

        assert_eq!(color, original);
    }
}
