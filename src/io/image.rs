use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::field::Field;
use crate::io::FieldWriter;
use crate::mesh::CartesianMesh;
use crate::time::SimulationClock;
use crate::util::*;
use std::path::{Path, PathBuf};

/// Maps field values onto the TURBO colour map, `low` to the first colour
/// and `high` to the last. Values outside the range are clamped.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColourRange {
    pub low: f64,
    pub high: f64,
}

impl Default for ColourRange {
    fn default() -> Self {
        ColourRange {
            low: -1.0,
            high: 1.0,
        }
    }
}

impl ColourRange {
    pub fn unit(&self, v: f64) -> f64 {
        let span = self.high - self.low;
        if span.abs() < SMALL || !v.is_finite() {
            return 0.5;
        }
        ((v - self.low) / span).clamp(0.0, 1.0)
    }

    fn pixel(&self, v: f64) -> image::Rgb<u8> {
        image::Rgb(colorous::TURBO.eval_continuous(self.unit(v)).as_array())
    }
}

/// Space-time picture of a 1D field, one row per written level.
pub struct Image1D {
    img_buffer: image::RgbImage,
    range: ColourRange,
}

impl Image1D {
    pub fn new(bound: AABB<1>, lines: u32, range: ColourRange) -> Self {
        let exclusive_bound = bound.exclusive_bounds();
        Image1D {
            img_buffer: image::RgbImage::new(exclusive_bound[0] as u32, lines),
            range,
        }
    }

    pub fn add_line(&mut self, l: u32, v: &[f64]) {
        debug_assert!(l < self.img_buffer.height());
        debug_assert_eq!(v.len(), self.img_buffer.width() as usize);
        for x in 0..self.img_buffer.width() {
            let c = self.range.pixel(v[x as usize]);
            self.img_buffer.put_pixel(x, l, c);
        }
    }

    pub fn write<P: AsRef<Path>>(self, path: &P) -> Result<()> {
        self.img_buffer.save(path)?;
        Ok(())
    }
}

/// Picture of the plane spanned by dimensions 0 and 1.
/// Higher dimensions are cut through the middle cell.
pub fn image2d<const GRID_DIMENSION: usize, DomainType, P>(
    domain: &DomainType,
    range: ColourRange,
    path: &P,
) -> Result<()>
where
    DomainType: DomainView<GRID_DIMENSION>,
    P: AsRef<Path>,
{
    if GRID_DIMENSION < 2 {
        return Err(WaveError::invalid(
            "plane images need at least two dimensions",
        ));
    }
    let aabb = domain.aabb();
    let exclusive_bounds = aabb.exclusive_bounds();
    let min = aabb.min();
    let mut coord = Coord::from_fn(|d, _| {
        aabb.bounds[(d, 0)] + (aabb.bounds[(d, 1)] - aabb.bounds[(d, 0)]) / 2
    });
    let mut img = image::RgbImage::new(
        exclusive_bounds[0] as u32,
        exclusive_bounds[1] as u32,
    );
    for x in 0..exclusive_bounds[0] {
        for y in 0..exclusive_bounds[1] {
            coord[0] = min[0] + x;
            coord[1] = min[1] + y;
            let c = range.pixel(domain.view(&coord));
            // row 0 is the top of the picture
            img.put_pixel(x as u32, (exclusive_bounds[1] - 1 - y) as u32, c);
        }
    }
    img.save(path)?;
    Ok(())
}

/// PNG output: frames for 2D and 3D runs, one space-time picture for 1D
/// runs written when the run ends.
pub struct ImageWriter {
    directory: PathBuf,
    range: ColourRange,
    lines: Vec<Vec<f64>>,
    line_field: Option<String>,
}

impl ImageWriter {
    pub fn new<P: AsRef<Path>>(directory: P, range: ColourRange) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(ImageWriter {
            directory: directory.as_ref().to_path_buf(),
            range,
            lines: Vec::new(),
            line_field: None,
        })
    }

    pub fn frame_name(&self, field: &str, step_index: usize) -> PathBuf {
        let mut result = self.directory.clone();
        result.push(format!("{field}_{step_index:04}.png"));
        result
    }

    pub fn history_name(&self, field: &str) -> PathBuf {
        let mut result = self.directory.clone();
        result.push(format!("{field}.png"));
        result
    }
}

impl<const GRID_DIMENSION: usize> FieldWriter<GRID_DIMENSION> for ImageWriter {
    fn write(
        &mut self,
        _mesh: &CartesianMesh<GRID_DIMENSION>,
        field: &Field<GRID_DIMENSION>,
        clock: &SimulationClock,
    ) -> Result<()> {
        if GRID_DIMENSION == 1 {
            self.lines.push(field.snapshot());
            self.line_field = Some(field.name().to_string());
            return Ok(());
        }
        let path = self.frame_name(field.name(), clock.step_index());
        tracing::debug!("Writing image: {:?}", path);
        image2d(field.domain(), self.range, &path)
    }

    fn finish(&mut self) -> Result<()> {
        let (Some(field), Some(first)) = (self.line_field.take(), self.lines.first())
        else {
            return Ok(());
        };
        let bound = AABB::new(matrix![0, first.len() as i32 - 1]);
        let mut img = Image1D::new(bound, self.lines.len() as u32, self.range);
        for (l, line) in self.lines.iter().enumerate() {
            img.add_line(l as u32, line);
        }
        let path = self.history_name(&field);
        tracing::debug!("Writing image: {:?}", path);
        img.write(&path)?;
        self.lines.clear();
        Ok(())
    }
}
