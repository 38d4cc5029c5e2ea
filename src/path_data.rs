//! SVG path data (`d` attribute) into typed segments.
//!
//! Segments keep the command exactly as written (absolute or relative,
//! plain or smooth); resolving them into points is the geometry
//! builder's job. Arc rotation is stored in radians.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    ClosePath,
    MoveToAbs { x: f32, y: f32 },
    MoveToRel { x: f32, y: f32 },
    LineToAbs { x: f32, y: f32 },
    LineToRel { x: f32, y: f32 },
    LineToHorizontalAbs { x: f32 },
    LineToHorizontalRel { x: f32 },
    LineToVerticalAbs { y: f32 },
    LineToVerticalRel { y: f32 },
    CurveToCubicAbs { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    CurveToCubicRel { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    CurveToCubicSmoothAbs { x2: f32, y2: f32, x: f32, y: f32 },
    CurveToCubicSmoothRel { x2: f32, y2: f32, x: f32, y: f32 },
    CurveToQuadraticAbs { x1: f32, y1: f32, x: f32, y: f32 },
    CurveToQuadraticRel { x1: f32, y1: f32, x: f32, y: f32 },
    CurveToQuadraticSmoothAbs { x: f32, y: f32 },
    CurveToQuadraticSmoothRel { x: f32, y: f32 },
    ArcAbs(ArcArgs),
    ArcRel(ArcArgs),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcArgs {
    pub radius_x: f32,
    pub radius_y: f32,
    /// x-axis rotation in radians.
    pub angle: f32,
    pub large_arc: bool,
    pub sweep: bool,
    pub x: f32,
    pub y: f32,
}

/// Parses path data. An unknown command or a truncated operand list ends
/// parsing; everything before it is returned.
pub fn parse_path_data(d: &str) -> Vec<PathSegment> {
    let mut segs = Vec::new();
    let mut p = PathParser::new(d);
    let mut cmd: Option<u8> = None;

    loop {
        p.skip_ws();
        if p.at_end() {
            break;
        }
        let c = match p.peek_command() {
            Some(c) => {
                p.i += 1;
                c
            }
            // Repeated operands reuse the previous command; after a
            // moveto they become linetos.
            None => match cmd {
                Some(b'M') => b'L',
                Some(b'm') => b'l',
                Some(b'Z' | b'z') | None => break,
                Some(prev) => prev,
            },
        };
        cmd = Some(c);

        let seg = match c {
            b'Z' | b'z' => Some(PathSegment::ClosePath),
            b'M' => p.pair().map(|(x, y)| PathSegment::MoveToAbs { x, y }),
            b'm' => p.pair().map(|(x, y)| PathSegment::MoveToRel { x, y }),
            b'L' => p.pair().map(|(x, y)| PathSegment::LineToAbs { x, y }),
            b'l' => p.pair().map(|(x, y)| PathSegment::LineToRel { x, y }),
            b'H' => p.number().map(|x| PathSegment::LineToHorizontalAbs { x }),
            b'h' => p.number().map(|x| PathSegment::LineToHorizontalRel { x }),
            b'V' => p.number().map(|y| PathSegment::LineToVerticalAbs { y }),
            b'v' => p.number().map(|y| PathSegment::LineToVerticalRel { y }),
            b'C' | b'c' => p.numbers::<6>().map(|[x1, y1, x2, y2, x, y]| {
                if c == b'C' {
                    PathSegment::CurveToCubicAbs { x1, y1, x2, y2, x, y }
                } else {
                    PathSegment::CurveToCubicRel { x1, y1, x2, y2, x, y }
                }
            }),
            b'S' | b's' => p.numbers::<4>().map(|[x2, y2, x, y]| {
                if c == b'S' {
                    PathSegment::CurveToCubicSmoothAbs { x2, y2, x, y }
                } else {
                    PathSegment::CurveToCubicSmoothRel { x2, y2, x, y }
                }
            }),
            b'Q' | b'q' => p.numbers::<4>().map(|[x1, y1, x, y]| {
                if c == b'Q' {
                    PathSegment::CurveToQuadraticAbs { x1, y1, x, y }
                } else {
                    PathSegment::CurveToQuadraticRel { x1, y1, x, y }
                }
            }),
            b'T' => p.pair().map(|(x, y)| PathSegment::CurveToQuadraticSmoothAbs { x, y }),
            b't' => p.pair().map(|(x, y)| PathSegment::CurveToQuadraticSmoothRel { x, y }),
            b'A' => p.arc().map(PathSegment::ArcAbs),
            b'a' => p.arc().map(PathSegment::ArcRel),
            other => {
                log::debug!("unsupported path command {:?}", other as char);
                None
            }
        };

        match seg {
            Some(seg) => segs.push(seg),
            None => break,
        }
    }

    segs
}

struct PathParser<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.i >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while self.i < self.bytes.len() {
            match self.bytes[self.i] {
                b' ' | b'\n' | b'\r' | b'\t' | b',' => self.i += 1,
                _ => break,
            }
        }
    }

    fn peek_command(&self) -> Option<u8> {
        let b = *self.bytes.get(self.i)?;
        // 'e'/'E' cannot start a command here; they only appear inside numbers.
        if b.is_ascii_alphabetic() { Some(b) } else { None }
    }

    fn number(&mut self) -> Option<f32> {
        self.skip_ws();
        let start = self.i;
        let end = crate::length::scan_number(self.bytes, start);
        if end == start {
            return None;
        }
        let s = std::str::from_utf8(&self.bytes[start..end]).ok()?;
        let v = s.parse::<f32>().ok()?;
        self.i = end;
        Some(v)
    }

    fn numbers<const N: usize>(&mut self) -> Option<[f32; N]> {
        let mut out = [0.0; N];
        for slot in out.iter_mut() {
            *slot = self.number()?;
        }
        Some(out)
    }

    fn pair(&mut self) -> Option<(f32, f32)> {
        let x = self.number()?;
        let y = self.number()?;
        Some((x, y))
    }

    fn flag(&mut self) -> Option<bool> {
        self.skip_ws();
        match self.bytes.get(self.i)? {
            b'0' => {
                self.i += 1;
                Some(false)
            }
            b'1' => {
                self.i += 1;
                Some(true)
            }
            _ => None,
        }
    }

    fn arc(&mut self) -> Option<ArcArgs> {
        let radius_x = self.number()?;
        let radius_y = self.number()?;
        let angle_deg = self.number()?;
        let large_arc = self.flag()?;
        let sweep = self.flag()?;
        let (x, y) = self.pair()?;
        Some(ArcArgs {
            radius_x,
            radius_y,
            angle: angle_deg.to_radians(),
            large_arc,
            sweep,
            x,
            y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_path() {
        let segs = parse_path_data("M 0 0 L 10 0 L 10 10 Z");
        assert_eq!(
            segs,
            vec![
                PathSegment::MoveToAbs { x: 0.0, y: 0.0 },
                PathSegment::LineToAbs { x: 10.0, y: 0.0 },
                PathSegment::LineToAbs { x: 10.0, y: 10.0 },
                PathSegment::ClosePath,
            ]
        );
    }

    #[test]
    fn implicit_lineto_after_moveto_keeps_relativity() {
        let segs = parse_path_data("m1 2 3 4 5 6");
        assert_eq!(
            segs,
            vec![
                PathSegment::MoveToRel { x: 1.0, y: 2.0 },
                PathSegment::LineToRel { x: 3.0, y: 4.0 },
                PathSegment::LineToRel { x: 5.0, y: 6.0 },
            ]
        );
    }

    #[test]
    fn compact_numbers_and_repeated_commands() {
        let segs = parse_path_data("M0,0C1,2,3,4,5,6 7 8 9 10 11 12h-1.5.5");
        assert_eq!(segs.len(), 5);
        let PathSegment::CurveToCubicAbs { x, y, .. } = segs[2] else {
            panic!("expected cubic, got {:?}", segs[2]);
        };
        assert_eq!((x, y), (11.0, 12.0));
        assert_eq!(segs[3], PathSegment::LineToHorizontalRel { x: -1.5 });
        assert_eq!(segs[4], PathSegment::LineToHorizontalRel { x: 0.5 });
    }

    #[test]
    fn parses_compact_arc_flags_without_separator() {
        let segs = parse_path_data("M10 10 A5 5 90 01 20 20");
        let PathSegment::ArcAbs(arc) = segs[1] else {
            panic!("expected arc, got {:?}", segs[1]);
        };
        assert!(!arc.large_arc);
        assert!(arc.sweep);
        assert!((arc.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!((arc.x, arc.y), (20.0, 20.0));
    }

    #[test]
    fn unknown_command_keeps_prefix() {
        let segs = parse_path_data("M0 0 L5 5 X 1 1 L 9 9");
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn truncated_operands_keep_prefix() {
        let segs = parse_path_data("M0 0 Q1 1 2");
        assert_eq!(segs, vec![PathSegment::MoveToAbs { x: 0.0, y: 0.0 }]);
    }

    #[test]
    fn exponents_are_numbers_not_commands() {
        let segs = parse_path_data("M1e1 2E-1");
        assert_eq!(segs, vec![PathSegment::MoveToAbs { x: 10.0, y: 0.2 }]);
    }
}
