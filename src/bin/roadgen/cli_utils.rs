use waygen::{RoadError, RoadResult};

/// Generic parser for delimited strings that return fixed-size arrays
pub fn parse_delimited<T, const N: usize>(
    input: &str,
    delimiter: char,
    type_name: &str,
    parser: impl Fn(&str) -> Result<T, std::num::ParseFloatError>,
) -> RoadResult<[T; N]>
where
    T: Copy + Default,
{
    let parts: Vec<&str> = input.split(delimiter).collect();
    if parts.len() != N {
        return Err(RoadError::InvalidArgument {
            reason: format!(
                "Invalid {type_name} format '{input}'. Expected {N} {delimiter}-separated values"
            ),
        });
    }

    let mut result = [T::default(); N];
    for (i, part) in parts.iter().enumerate() {
        result[i] = parser(part.trim()).map_err(|_| RoadError::InvalidArgument {
            reason: format!("Invalid {type_name} value: '{part}'"),
        })?;
    }

    Ok(result)
}

/// Parse size string "WIDTHxHEIGHT" in heightmap samples
pub fn parse_size(size_str: &str) -> RoadResult<(u32, u32)> {
    let [width, height] = parse_delimited::<f32, 2>(size_str, 'x', "size", |s| s.parse())?;
    let (width, height) = (width as u32, height as u32);

    if width < 2 || height < 2 {
        return Err(RoadError::InvalidArgument {
            reason: "Width and height must be at least 2 samples".to_string(),
        });
    }

    if width > 2048 || height > 2048 {
        return Err(RoadError::InvalidArgument {
            reason: "Width and height must not exceed 2048".to_string(),
        });
    }

    Ok((width, height))
}

/// Parse population range string "MIN,MAX"
pub fn parse_population_range(range_str: &str) -> RoadResult<(u32, u32)> {
    let [min, max] = parse_delimited::<f32, 2>(range_str, ',', "population range", |s| s.parse())?;

    if min < 1.0 {
        return Err(RoadError::InvalidArgument {
            reason: "Populations must be at least 1".to_string(),
        });
    }

    if min > max {
        return Err(RoadError::InvalidArgument {
            reason: "Minimum population must be less than or equal to maximum population"
                .to_string(),
        });
    }

    Ok((min as u32, max as u32))
}

/// Clamp the requested settlement count to something the builder can handle
pub fn validate_settlement_count(count: u32) -> u32 {
    if !(2..=200).contains(&count) {
        println!(
            "Warning: Settlement count {count} is out of range [2, 200], clamping to valid range"
        );
        count.clamp(2, 200)
    } else {
        count
    }
}

/// Output names are joined onto the output directory, so keep them relative
pub fn validate_output_name(filename: &str) -> RoadResult<()> {
    use std::path::Path;

    if Path::new(filename).is_absolute() {
        return Err(RoadError::InvalidArgument {
            reason: format!(
                "Output name must be relative to the output directory, \
                 got absolute path: {filename}"
            ),
        });
    }

    if filename.contains("..") {
        return Err(RoadError::InvalidArgument {
            reason: "Output name cannot contain '..'".to_string(),
        });
    }

    Ok(())
}
