//! Segment-driven resource ID parser

use crate::error::{ParseError, Result};
use crate::segment::{Segment, SegmentKind};
use std::collections::HashMap;

/// Parser matches an input string against a list of declared segments
pub struct Parser {
    segments: Vec<Segment>,
}

/// Values captured from the variable segments of a parsed ID
#[derive(Debug, Clone)]
pub struct ParseResult {
    input: String,
    values: HashMap<&'static str, String>,
}

impl ParseResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Returns the captured value for `name` or an error naming the segment
    pub fn required(&self, name: &'static str) -> Result<String> {
        match self.values.get(name) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(ParseError::MissingSegment {
                input: self.input.clone(),
                segment: name.to_string(),
                example: String::new(),
            }),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Parser {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse `input` into its variable segment values.
    ///
    /// Literal segments are compared exactly unless `insensitively` is set,
    /// in which case ASCII case differences in literals are accepted.
    pub fn parse(&self, input: &str, insensitively: bool) -> Result<ParseResult> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let trimmed = input.strip_prefix('/').unwrap_or(input);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut components: Vec<&str> = trimmed.split('/').collect();

        let mut values = HashMap::new();
        let mut declared: &[Segment] = &self.segments;

        if let Some(first) = self.segments.first() {
            if first.kind == SegmentKind::Scope {
                declared = &self.segments[1..];
                if components.len() <= declared.len() {
                    return Err(ParseError::MissingSegment {
                        input: input.to_string(),
                        segment: first.name.to_string(),
                        example: first.example.to_string(),
                    });
                }

                let split = components.len() - declared.len();
                let scope = &components[..split];
                if scope.iter().any(|c| c.is_empty()) {
                    return Err(ParseError::MissingSegment {
                        input: input.to_string(),
                        segment: first.name.to_string(),
                        example: first.example.to_string(),
                    });
                }
                values.insert(first.name, format!("/{}", scope.join("/")));
                components = components.split_off(split);
            }
        }

        for (position, segment) in declared.iter().enumerate() {
            let component = match components.get(position) {
                Some(c) if !c.is_empty() => *c,
                _ => {
                    return Err(ParseError::MissingSegment {
                        input: input.to_string(),
                        segment: segment.literal().unwrap_or(segment.name).to_string(),
                        example: segment.example.to_string(),
                    })
                }
            };

            match segment.kind {
                SegmentKind::Static(expected) | SegmentKind::ResourceProvider(expected) => {
                    let matches = if insensitively {
                        component.eq_ignore_ascii_case(expected)
                    } else {
                        component == expected
                    };
                    if !matches {
                        return Err(ParseError::UnexpectedSegment {
                            input: input.to_string(),
                            segment: segment.name.to_string(),
                            expected: expected.to_string(),
                            actual: component.to_string(),
                        });
                    }
                }
                SegmentKind::Scope => {
                    return Err(ParseError::Invalid {
                        input: input.to_string(),
                        reason: format!("scope segment {:?} must come first", segment.name),
                    });
                }
                SegmentKind::SubscriptionId
                | SegmentKind::ResourceGroup
                | SegmentKind::UserSpecified => {
                    values.insert(segment.name, component.to_string());
                }
            }
        }

        if components.len() > declared.len() {
            return Err(ParseError::TrailingSegments {
                input: input.to_string(),
                trailing: components[declared.len()..].join("/"),
            });
        }

        Ok(ParseResult {
            input: input.to_string(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_segments() -> Vec<Segment> {
        let mut segments = Segment::resource_group_prefix().to_vec();
        segments.extend([
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftDataBox", "Microsoft.DataBox"),
            Segment::static_segment("staticJobs", "jobs"),
            Segment::user_specified("jobName", "jobValue"),
        ]);
        segments
    }

    #[test]
    fn parser_extracts_variable_segments() {
        let parser = Parser::new(job_segments());
        let result = parser
            .parse(
                "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DataBox/jobs/job1",
                false,
            )
            .unwrap();

        assert_eq!(result.get("subscriptionId"), Some("sub"));
        assert_eq!(result.get("resourceGroupName"), Some("rg"));
        assert_eq!(result.get("jobName"), Some("job1"));
    }

    #[test]
    fn parser_names_first_missing_segment() {
        let parser = Parser::new(job_segments());
        let err = parser
            .parse("/subscriptions/sub/resourceGroups/", false)
            .unwrap_err();

        match err {
            ParseError::MissingSegment { segment, .. } => assert_eq!(segment, "resourceGroupName"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parser_rejects_empty_middle_segment() {
        let parser = Parser::new(job_segments());
        let err = parser
            .parse(
                "/subscriptions//resourceGroups/rg/providers/Microsoft.DataBox/jobs/job1",
                false,
            )
            .unwrap_err();

        assert!(matches!(err, ParseError::MissingSegment { ref segment, .. } if segment == "subscriptionId"));
    }

    #[test]
    fn parser_rejects_trailing_segments() {
        let parser = Parser::new(job_segments());
        let err = parser
            .parse(
                "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DataBox/jobs/job1/extra/value",
                false,
            )
            .unwrap_err();

        assert!(matches!(err, ParseError::TrailingSegments { ref trailing, .. } if trailing == "extra/value"));
    }

    #[test]
    fn parser_case_sensitivity_is_opt_in() {
        let parser = Parser::new(job_segments());
        let input = "/subscriptions/sub/resourcegroups/rg/providers/microsoft.databox/JOBS/job1";

        assert!(matches!(
            parser.parse(input, false),
            Err(ParseError::UnexpectedSegment { .. })
        ));

        let result = parser.parse(input, true).unwrap();
        assert_eq!(result.get("jobName"), Some("job1"));
    }

    #[test]
    fn parser_splits_scope_from_tail() {
        let parser = Parser::new(vec![
            Segment::scope("scope"),
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftAuthorization", "Microsoft.Authorization"),
            Segment::static_segment("staticLocks", "locks"),
            Segment::user_specified("lockName", "lockValue"),
        ]);

        let result = parser
            .parse(
                "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acc/providers/Microsoft.Authorization/locks/DATABOX_SERVICE",
                false,
            )
            .unwrap();

        assert_eq!(
            result.get("scope"),
            Some("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acc")
        );
        assert_eq!(result.get("lockName"), Some("DATABOX_SERVICE"));

        assert!(parser
            .parse("/providers/Microsoft.Authorization/locks/name", false)
            .is_err());
    }
}
