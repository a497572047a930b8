use nom::{
    branch::alt,
    character::complete::{anychar, char},
    combinator::{eof, map},
    multi::separated_list1,
    sequence::separated_pair,
    IResult,
};

use crate::errors::ParseErrorKind;

type KeySpan = (char, char);

fn parse_range(input: &str) -> IResult<&str, KeySpan> {
    let (input, (a, b)) = separated_pair(anychar, char('-'), anychar)(input)?;

    if a <= b {
        Ok((input, (a, b)))
    } else {
        Ok((input, (b, a)))
    }
}

fn parse_atom(input: &str) -> IResult<&str, KeySpan> {
    alt((parse_range, map(anychar, |c| (c, c))))(input)
}

fn parse_seq(input: &str) -> IResult<&str, Vec<KeySpan>> {
    let (input, spans) = separated_list1(char(','), parse_atom)(input)?;
    let (input, _) = eof(input)?;

    Ok((input, spans))
}

/// Expand a configuration key like `"a-z"` or `"a,c,e-g"` into the keys it names.
pub fn parse_keys(source: &str) -> Result<Vec<char>, ParseErrorKind> {
    let spans = match parse_seq(source) {
        Ok((_, spans)) => spans,
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let offset = source.chars().count() - e.input.chars().count();

            return Err(ParseErrorKind::InvalidKeys { keys: source.to_string(), offset });
        },
        Err(nom::Err::Incomplete(_)) => {
            let offset = source.chars().count();

            return Err(ParseErrorKind::InvalidKeys { keys: source.to_string(), offset });
        },
    };

    let keys = spans.into_iter().flat_map(|(lo, hi)| lo..=hi).collect();

    return Ok(keys);
}
