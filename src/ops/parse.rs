// ============================================================================
// EDIT STEP PARSER — text form of commands for the CLI and the shell
// ============================================================================
//
// Syntax: `name`, `name=arg,arg,...` or `name arg arg ...`
//   rotate=90          crop=100,80,10,10       blend=other.png,0.5
//   color=255,0,255,0.3                         perspective=x0,y0,...,x3,y3
//   undo               redo
// ============================================================================

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ParseError;
use crate::ops::Command;

/// One step of an edit sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum EditStep {
    Apply(Command),
    /// Blend with an image that still has to be loaded from disk.
    Blend { path: PathBuf, alpha: f32 },
    Undo,
    Redo,
}

impl FromStr for EditStep {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_step(s)
    }
}

/// Parse a single edit step.
pub fn parse_step(input: &str) -> Result<EditStep, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let (name, rest) = match input.split_once(|c: char| c == '=' || c.is_whitespace()) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };
    let op = name.to_lowercase();

    // Blend takes a path, which may itself contain separators: the alpha is
    // always the last token.
    if op == "blend" {
        let Some((path, alpha)) = rest.rsplit_once(|c: char| c == ',' || c.is_whitespace()) else {
            return Err(ParseError::ArgumentCount { op, expected: 2, got: usize::from(!rest.is_empty()) });
        };
        let path = path.trim();
        if path.is_empty() {
            return Err(ParseError::ArgumentCount { op, expected: 2, got: 1 });
        }
        let alpha = fraction(&op, alpha.trim())?;
        return Ok(EditStep::Blend { path: PathBuf::from(path), alpha });
    }

    let args: Vec<&str> = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|a| !a.is_empty())
        .collect();

    let command = match op.as_str() {
        "undo" => {
            expect_args(&op, &args, 0)?;
            return Ok(EditStep::Undo);
        }
        "redo" => {
            expect_args(&op, &args, 0)?;
            return Ok(EditStep::Redo);
        }
        "identity" => {
            expect_args(&op, &args, 0)?;
            Command::Identity
        }
        "gray" | "grey" | "bw" => {
            expect_args(&op, &args, 0)?;
            Command::Gray
        }
        "crop" => {
            expect_args(&op, &args, 4)?;
            Command::Crop {
                width: number(&op, args[0])?,
                height: number(&op, args[1])?,
                x: number(&op, args[2])?,
                y: number(&op, args[3])?,
            }
        }
        "rotate" => Command::RotateInFrame { angle: single_finite(&op, &args)? },
        "saturate" | "saturation" => Command::Saturate { value: single(&op, &args)? },
        "brighten" | "brightness" => Command::Brighten { value: single(&op, &args)? },
        "hue" => Command::Hue { value: single(&op, &args)? },
        "contrast" => Command::Contrast { value: single(&op, &args)? },
        "lighten" | "light" => Command::Lighten { value: single(&op, &args)? },
        "tint" => Command::Tint { value: single(&op, &args)? },
        "temperature" | "temp" => Command::Temperature { value: single(&op, &args)? },
        "blur" => Command::Blur { sigma: single_finite(&op, &args)? },
        "sharpen" => Command::Sharpen { amount: single_finite(&op, &args)? },
        "color" => {
            expect_args(&op, &args, 4)?;
            Command::ApplyColor {
                r: number(&op, args[0])?,
                g: number(&op, args[1])?,
                b: number(&op, args[2])?,
                alpha: fraction(&op, args[3])?,
            }
        }
        "perspective" => {
            expect_args(&op, &args, 8)?;
            let mut quad = [(0.0f32, 0.0f32); 4];
            for (i, corner) in quad.iter_mut().enumerate() {
                *corner = (finite(&op, args[i * 2])?, finite(&op, args[i * 2 + 1])?);
            }
            Command::TransformPerspective { quad }
        }
        _ => return Err(ParseError::UnknownOperation(name.to_string())),
    };

    Ok(EditStep::Apply(command))
}

/// Parse a sequence of steps, one step per item.
pub fn parse_steps<'a, I>(items: I) -> Result<Vec<EditStep>, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    items.into_iter().map(parse_step).collect()
}

fn expect_args(op: &str, args: &[&str], expected: usize) -> Result<(), ParseError> {
    if args.len() != expected {
        return Err(ParseError::ArgumentCount {
            op: op.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn single<T: FromStr>(op: &str, args: &[&str]) -> Result<T, ParseError> {
    expect_args(op, args, 1)?;
    number(op, args[0])
}

fn single_finite<T: FromStr + Into<f64> + Copy>(op: &str, args: &[&str]) -> Result<T, ParseError> {
    expect_args(op, args, 1)?;
    finite(op, args[0])
}

fn invalid(op: &str, value: &str) -> ParseError {
    ParseError::InvalidValue {
        op: op.to_string(),
        value: value.to_string(),
    }
}

fn number<T: FromStr>(op: &str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| invalid(op, value))
}

/// Rejects `inf`, `NaN` and literals that overflow the target type.
fn finite<T: FromStr + Into<f64> + Copy>(op: &str, value: &str) -> Result<T, ParseError> {
    let parsed: T = number(op, value)?;
    if !parsed.into().is_finite() {
        return Err(invalid(op, value));
    }
    Ok(parsed)
}

/// A blend weight in `0..=1`.
fn fraction(op: &str, value: &str) -> Result<f32, ParseError> {
    let parsed: f32 = finite(op, value)?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(invalid(op, value));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_steps() {
        assert_eq!(parse_step("gray").unwrap(), EditStep::Apply(Command::Gray));
        assert_eq!(parse_step("undo").unwrap(), EditStep::Undo);
        assert_eq!(parse_step(" REDO ").unwrap(), EditStep::Redo);
        assert_eq!(
            parse_step("rotate=90").unwrap(),
            EditStep::Apply(Command::RotateInFrame { angle: 90.0 })
        );
        assert_eq!(
            parse_step("blur 2.5").unwrap(),
            EditStep::Apply(Command::Blur { sigma: 2.5 })
        );
        assert_eq!(
            parse_step("temp=-4").unwrap(),
            EditStep::Apply(Command::Temperature { value: -4 })
        );
    }

    #[test]
    fn test_parse_multi_argument_steps() {
        assert_eq!(
            parse_step("crop=100,80,10,5").unwrap(),
            EditStep::Apply(Command::Crop { width: 100, height: 80, x: 10, y: 5 })
        );
        assert_eq!(
            parse_step("color 255 0 128 0.25").unwrap(),
            EditStep::Apply(Command::ApplyColor { r: 255, g: 0, b: 128, alpha: 0.25 })
        );
        assert_eq!(
            parse_step("perspective=0,0,10,1,10,9,1,10").unwrap(),
            EditStep::Apply(Command::TransformPerspective {
                quad: [(0.0, 0.0), (10.0, 1.0), (10.0, 9.0), (1.0, 10.0)]
            })
        );
    }

    #[test]
    fn test_parse_blend_keeps_path() {
        assert_eq!(
            parse_step("blend=shots/sky,2.png,0.4").unwrap(),
            EditStep::Blend { path: PathBuf::from("shots/sky,2.png"), alpha: 0.4 }
        );
        assert_eq!(
            parse_step("blend other.png 0.5").unwrap(),
            EditStep::Blend { path: PathBuf::from("other.png"), alpha: 0.5 }
        );
        assert!(matches!(parse_step("blend=0.5"), Err(ParseError::ArgumentCount { .. })));
        assert!(matches!(parse_step("blend"), Err(ParseError::ArgumentCount { got: 0, .. })));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_step("   "), Err(ParseError::Empty));
        assert_eq!(parse_step("explode"), Err(ParseError::UnknownOperation("explode".into())));
        assert_eq!(
            parse_step("crop=1,2"),
            Err(ParseError::ArgumentCount { op: "crop".into(), expected: 4, got: 2 })
        );
        assert_eq!(
            parse_step("rotate=left"),
            Err(ParseError::InvalidValue { op: "rotate".into(), value: "left".into() })
        );
        assert!(matches!(parse_step("crop=-1,2,3,4"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("color=300,0,0,1"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("undo=1"), Err(ParseError::ArgumentCount { .. })));
    }

    #[test]
    fn test_parse_rejects_non_finite_numbers() {
        assert_eq!(
            parse_step("blur=inf"),
            Err(ParseError::InvalidValue { op: "blur".into(), value: "inf".into() })
        );
        assert!(matches!(parse_step("blur=NaN"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("blur=1e39"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("sharpen=-inf"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("rotate=infinity"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("rotate=1e400"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(
            parse_step("perspective=0,0,10,0,10,NaN,0,10"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(parse_step("color=1,2,3,nan"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("blend=a.png,inf"), Err(ParseError::InvalidValue { .. })));
        // Large but finite sigma is accepted; the blur bounds its own radius.
        assert_eq!(parse_step("blur=1e9").unwrap(), EditStep::Apply(Command::Blur { sigma: 1e9 }));
    }

    #[test]
    fn test_parse_rejects_alpha_out_of_range() {
        assert_eq!(
            parse_step("color=255,0,0,1.5"),
            Err(ParseError::InvalidValue { op: "color".into(), value: "1.5".into() })
        );
        assert!(matches!(parse_step("color=255,0,0,-0.1"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_step("blend=a.png,2"), Err(ParseError::InvalidValue { .. })));
        assert!(parse_step("color=255,0,0,1").is_ok());
        assert!(parse_step("color=255,0,0,0").is_ok());
        assert!(parse_step("blend=a.png,0").is_ok());
    }

    #[test]
    fn test_parse_steps_and_from_str() {
        let steps = parse_steps(["rotate=90", "gray", "undo"]).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], EditStep::Undo);
        let step: EditStep = "sharpen=1.5".parse().unwrap();
        assert_eq!(step, EditStep::Apply(Command::Sharpen { amount: 1.5 }));
    }
}
