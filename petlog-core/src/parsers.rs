//! Chat log parser for pet search results.
//!
//! The game prints a pet lookup as a block of lines:
//! ```text
//! [루비] [1등급] 페트 검색 결과 입니다.
//! 초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20
//! 성장 : 공격력 2.5, 방어력 1.0, 순발력 2.0, 성장 7.5, 내구력 2.0
//! 기술 : 공격 방어, 속성 : 화6 수4 , 탑승 : 불가, 경로 : 쟈루 섬(동357 남183) 포획
//! ```
//! Blocks may be interleaved with unrelated chat. Every line after a header
//! belongs to that header's pet until the next header appears.

use crate::error::Result;
use crate::file_utils::{ChatEncoding, read_chat_file};
use crate::models::{Attributes, BaseStats, Grade, GrowthStats, PetIndex, PetRecord};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, trace};

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(
        r"^\[(?P<name>[^\]]+)\]\s*(?:\[(?P<grade>\d)등급\]\s*)?페트 검색 결과 입니다\."
    )
    .unwrap();
    static ref INIT_RE: Regex = Regex::new(concat!(
        r"초기\s*:\s*레벨\s*:?[\s\d]*,",
        r"\s*공격력\s*(?P<atk>\d+),",
        r"\s*방어력\s*(?P<def>\d+),",
        r"\s*순발력\s*(?P<agi>\d+),",
        r"\s*내구력\s*(?P<hp>\d+)",
    ))
    .unwrap();
    // The fourth figure is the total growth; it is matched but not kept.
    static ref GROW_RE: Regex = Regex::new(concat!(
        r"성장\s*:\s*공격력\s*(?P<atk>\d+(?:\.\d+)?),",
        r"\s*방어력\s*(?P<def>\d+(?:\.\d+)?),",
        r"\s*순발력\s*(?P<agi>\d+(?:\.\d+)?),",
        r"\s*성장\s*\d+(?:\.\d+)?,",
        r"\s*내구력\s*(?P<hp>\d+(?:\.\d+)?)",
    ))
    .unwrap();
    static ref ATTR_SEG_RE: Regex = Regex::new(r"속성\s*:\s*([^,]+)").unwrap();
    static ref ATTR_TOKEN_RE: Regex = Regex::new(r"^([지수화풍])\s*(\d+)").unwrap();
    static ref ROUTE_RE: Regex = Regex::new(r"경로\s*:\s*(.+)").unwrap();
}

/// Map the optional grade digit of a header to a tier.
///
/// `1` is top, `2` is high, anything else (or no digit) is normal.
pub fn grade_from_digit(digit: Option<&str>) -> Grade {
    match digit {
        Some("1") => Grade::Top,
        Some("2") => Grade::High,
        _ => Grade::Normal,
    }
}

/// Read a chat log from disk and extract every pet in it.
pub fn parse_chat_file(path: &Path, encoding: ChatEncoding) -> Result<PetIndex> {
    let text = read_chat_file(path, encoding)?;
    let pets = parse_chat(&text);
    info!("Extracted {} pets from {:?}", pets.len(), path);
    Ok(pets)
}

/// Extract pet records from chat log text.
pub fn parse_chat(text: &str) -> PetIndex {
    let mut pets = PetIndex::new();
    let mut current: Option<usize> = None;

    for (line_no, line) in numbered_lines(text) {
        scan_line(&mut pets, &mut current, line.trim(), line_no);
    }

    pets
}

/// Split text into lines paired with their 1-based line number.
///
/// CRLF counts as one line break. A bare CR inside a line (some client
/// logs use it) also separates entries, but keeps the line number.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .flat_map(|(idx, physical)| physical.split('\r').map(move |part| (idx + 1, part)))
}

/// Classification of a line against the header pattern.
#[derive(Debug, PartialEq, Eq)]
enum HeaderLine<'a> {
    Pet { name: &'a str, digit: Option<&'a str> },
    /// Header shape with a blank name; its block belongs to no pet.
    Blank,
    NotHeader,
}

fn parse_header(line: &str) -> HeaderLine<'_> {
    let Some(caps) = HEADER_RE.captures(line) else {
        return HeaderLine::NotHeader;
    };
    let name = caps.name("name").map_or("", |m| m.as_str().trim());
    if name.is_empty() {
        return HeaderLine::Blank;
    }
    let digit = caps.name("grade").map(|m| m.as_str());
    HeaderLine::Pet { name, digit }
}

fn scan_line(pets: &mut PetIndex, current: &mut Option<usize>, line: &str, line_no: usize) {
    if line.is_empty() {
        return;
    }

    match parse_header(line) {
        HeaderLine::Pet { name, digit } => {
            let pos = pets.find_or_insert(name);
            let record = pets.record_mut(pos);
            if digit.is_some() || record.grade.is_none() {
                record.grade = Some(grade_from_digit(digit));
            }
            debug!("Line {}: header for {} ({:?})", line_no, name, record.grade);
            *current = Some(pos);
        }
        HeaderLine::Blank => {
            debug!("Line {}: header without a pet name, block skipped", line_no);
            *current = None;
        }
        // Lines before the first header or inside a blank block are inert
        HeaderLine::NotHeader => {
            if let Some(pos) = *current {
                apply_line(pets.record_mut(pos), line, line_no);
            }
        }
    }
}

/// Apply one non-header line to the current record.
fn apply_line(record: &mut PetRecord, line: &str, line_no: usize) {
    if let Some(caps) = INIT_RE.captures(line) {
        match parse_base_stats(&caps) {
            Some(s0) => {
                trace!("Line {}: base stats for {}", line_no, record.name);
                record.s0 = Some(s0);
            }
            None => debug!("Line {}: base stats out of range, ignored", line_no),
        }
        return;
    }

    if let Some(caps) = GROW_RE.captures(line) {
        match parse_growth_stats(&caps) {
            Some(sg) => {
                trace!("Line {}: growth stats for {}", line_no, record.name);
                record.sg = Some(sg);
            }
            None => debug!("Line {}: growth stats out of range, ignored", line_no),
        }
        return;
    }

    if line.contains("기술") && line.contains("속성") {
        if let Some(attr) = parse_attributes(line) {
            record.attr = Some(attr);
        }
        if let Some(route) = parse_route(line) {
            record.route = Some(route);
        }
    }
}

/// Parse a captured number, accepting ASCII and full-width (`０`-`９`) digits.
///
/// Digits from other scripts still satisfy `\d` but yield None, which
/// leaves the line without effect.
fn parse_number<T: FromStr>(text: &str) -> Option<T> {
    let ascii: Option<String> = text
        .chars()
        .map(|c| match c {
            '0'..='9' | '.' => Some(c),
            '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10),
            _ => None,
        })
        .collect();
    ascii?.parse().ok()
}

fn capture<T: FromStr>(caps: &Captures, name: &str) -> Option<T> {
    parse_number(caps.name(name)?.as_str())
}

fn parse_base_stats(caps: &Captures) -> Option<BaseStats> {
    Some(BaseStats {
        atk: capture(caps, "atk")?,
        def: capture(caps, "def")?,
        agi: capture(caps, "agi")?,
        hp: capture(caps, "hp")?,
    })
}

fn parse_growth_stats(caps: &Captures) -> Option<GrowthStats> {
    Some(GrowthStats {
        atk: capture(caps, "atk")?,
        def: capture(caps, "def")?,
        agi: capture(caps, "agi")?,
        hp: capture(caps, "hp")?,
    })
}

/// Elemental values from the `속성 :` segment, or None when absent or all zero.
fn parse_attributes(line: &str) -> Option<Attributes> {
    let segment = ATTR_SEG_RE.captures(line)?.get(1)?.as_str();

    let mut attr = Attributes::default();
    for token in segment.split_whitespace() {
        let Some(caps) = ATTR_TOKEN_RE.captures(token) else {
            continue;
        };
        let element = caps[1].chars().next();
        let value = parse_number::<u32>(&caps[2]);
        if let (Some(element), Some(value)) = (element, value) {
            attr.set(element, value);
        }
    }

    if attr.is_empty() { None } else { Some(attr) }
}

/// Capture location after `경로 :`.
fn parse_route(line: &str) -> Option<String> {
    let caps = ROUTE_RE.captures(line)?;
    Some(caps.get(1)?.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUBY_BLOCK: &str = "\
[루비] [1등급] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20
성장 : 공격력 2.5, 방어력 1.0, 순발력 2, 성장 7.5, 내구력 2.0
기술 : 공격 방어, 속성 : 화6 수4 , 탑승 : 불가, 경로 : 쟈루 섬(동357 남183) 포획
";

    #[test]
    fn test_grade_from_digit() {
        assert_eq!(grade_from_digit(Some("1")), Grade::Top);
        assert_eq!(grade_from_digit(Some("2")), Grade::High);
        assert_eq!(grade_from_digit(Some("3")), Grade::Normal);
        assert_eq!(grade_from_digit(None), Grade::Normal);
    }

    #[test]
    fn test_parse_header_and_base_stats() {
        let text = "[루비] [1등급] 페트 검색 결과 입니다.\n초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20\n";
        let pets = parse_chat(text);

        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.grade, Some(Grade::Top));
        assert_eq!(ruby.s0, Some(BaseStats { atk: 10, def: 5, agi: 7, hp: 20 }));
        assert_eq!(ruby.sg, None);
        assert_eq!(ruby.attr, None);
        assert_eq!(ruby.route, None);
    }

    #[test]
    fn test_parse_full_block() {
        let pets = parse_chat(RUBY_BLOCK);
        assert_eq!(pets.len(), 1);

        let ruby = pets.get("루비").unwrap();
        assert_eq!(
            ruby.sg,
            Some(GrowthStats { atk: 2.5, def: 1.0, agi: 2.0, hp: 2.0 })
        );
        assert_eq!(
            ruby.attr,
            Some(Attributes { earth: 0, water: 4, fire: 6, wind: 0 })
        );
        assert_eq!(ruby.route.as_deref(), Some("쟈루 섬(동357 남183) 포획"));
    }

    #[test]
    fn test_total_growth_is_discarded() {
        let pets = parse_chat(RUBY_BLOCK);
        let json = serde_json::to_string(pets.get("루비").unwrap()).unwrap();
        assert!(!json.contains("7.5"));
        assert!(!json.contains("성장"));
    }

    #[test]
    fn test_lines_before_first_header_are_ignored() {
        let text = "\
초기 : 레벨 1, 공격력 99, 방어력 99, 순발력 99, 내구력 99
아무개 : 안녕하세요
[골드] 페트 검색 결과 입니다.
";
        let pets = parse_chat(text);
        assert_eq!(pets.len(), 1);
        let gold = pets.get("골드").unwrap();
        assert_eq!(gold.grade, Some(Grade::Normal));
        assert_eq!(gold.s0, None);
    }

    #[test]
    fn test_digitless_header_keeps_established_grade() {
        let text = "\
[루비] [2등급] 페트 검색 결과 입니다.
[루비] 페트 검색 결과 입니다.
";
        let pets = parse_chat(text);
        assert_eq!(pets.get("루비").unwrap().grade, Some(Grade::High));
    }

    #[test]
    fn test_digited_header_overwrites_grade() {
        let text = "\
[루비] 페트 검색 결과 입니다.
[루비] [1등급] 페트 검색 결과 입니다.
[골드] [1등급] 페트 검색 결과 입니다.
[골드] [3등급] 페트 검색 결과 입니다.
";
        let pets = parse_chat(text);
        assert_eq!(pets.get("루비").unwrap().grade, Some(Grade::Top));
        assert_eq!(pets.get("골드").unwrap().grade, Some(Grade::Normal));
    }

    #[test]
    fn test_repeated_header_reuses_record() {
        let text = "\
[루비] [1등급] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20
[골드] 페트 검색 결과 입니다.
[루비] 페트 검색 결과 입니다.
경로 없음 기술 : 없음, 속성 : 지10, 경로 : 사마 마을
";
        let pets = parse_chat(text);
        assert_eq!(pets.len(), 2);

        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.s0, Some(BaseStats { atk: 10, def: 5, agi: 7, hp: 20 }));
        assert_eq!(ruby.route.as_deref(), Some("사마 마을"));
        assert_eq!(pets.get("골드").unwrap().route, None);
    }

    #[test]
    fn test_base_stats_idempotent() {
        let line = "초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20";
        let once = parse_chat(&format!("[루비] 페트 검색 결과 입니다.\n{}\n", line));
        let twice = parse_chat(&format!("[루비] 페트 검색 결과 입니다.\n{}\n{}\n", line, line));
        assert_eq!(once.get("루비").unwrap().s0, twice.get("루비").unwrap().s0);
    }

    #[test]
    fn test_growth_stats_idempotent() {
        let line = "성장 : 공격력 2.5, 방어력 1.0, 순발력 2.0, 성장 7.5, 내구력 2.0";
        let once = parse_chat(&format!("[루비] 페트 검색 결과 입니다.\n{}\n", line));
        let twice = parse_chat(&format!("[루비] 페트 검색 결과 입니다.\n{}\n{}\n", line, line));
        assert_eq!(once.get("루비").unwrap().sg, twice.get("루비").unwrap().sg);
        assert_eq!(
            twice.get("루비").unwrap().sg,
            Some(GrowthStats { atk: 2.5, def: 1.0, agi: 2.0, hp: 2.0 })
        );
    }

    #[test]
    fn test_later_growth_stats_replace_earlier() {
        let text = "\
[루비] 페트 검색 결과 입니다.
성장 : 공격력 2.5, 방어력 1.0, 순발력 2.0, 성장 7.5, 내구력 2.0
성장 : 공격력 3, 방어력 1.5, 순발력 2.25, 성장 9, 내구력 2.5
";
        let pets = parse_chat(text);
        assert_eq!(
            pets.get("루비").unwrap().sg,
            Some(GrowthStats { atk: 3.0, def: 1.5, agi: 2.25, hp: 2.5 })
        );
    }

    #[test]
    fn test_later_stats_replace_earlier() {
        let text = "\
[루비] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20
초기 : 레벨 1, 공격력 11, 방어력 6, 순발력 8, 내구력 21
";
        let pets = parse_chat(text);
        assert_eq!(
            pets.get("루비").unwrap().s0,
            Some(BaseStats { atk: 11, def: 6, agi: 8, hp: 21 })
        );
    }

    #[test]
    fn test_all_zero_attributes_are_omitted() {
        let text = "\
[루비] 페트 검색 결과 입니다.
기술 : 공격, 속성 : 화0 없음 , 경로 : 미확인
";
        let pets = parse_chat(text);
        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.attr, None);
        assert_eq!(ruby.route.as_deref(), Some("미확인"));
    }

    #[test]
    fn test_all_zero_attributes_keep_previous_value() {
        let text = "\
[루비] 페트 검색 결과 입니다.
기술 : 공격, 속성 : 풍10
기술 : 공격, 속성 : 물
";
        let pets = parse_chat(text);
        assert_eq!(
            pets.get("루비").unwrap().attr,
            Some(Attributes { earth: 0, water: 0, fire: 0, wind: 10 })
        );
    }

    #[test]
    fn test_attribute_segment_stops_at_comma() {
        let text = "\
[루비] 페트 검색 결과 입니다.
기술 : 공격, 속성 : 지3, 화7 기타
";
        let pets = parse_chat(text);
        assert_eq!(
            pets.get("루비").unwrap().attr,
            Some(Attributes { earth: 3, water: 0, fire: 0, wind: 0 })
        );
        assert_eq!(pets.get("루비").unwrap().route, None);
    }

    #[test]
    fn test_skill_line_requires_both_keywords() {
        let text = "\
[루비] 페트 검색 결과 입니다.
속성 : 화6 수4, 경로 : 어딘가
";
        let pets = parse_chat(text);
        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.attr, None);
        assert_eq!(ruby.route, None);
    }

    #[test]
    fn test_crlf_and_indented_lines() {
        let text = "  [루비] [2등급] 페트 검색 결과 입니다.  \r\n\r\n   초기 : 레벨 1, 공격력 1, 방어력 2, 순발력 3, 내구력 4\r\n";
        let pets = parse_chat(text);
        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.grade, Some(Grade::High));
        assert_eq!(ruby.s0, Some(BaseStats { atk: 1, def: 2, agi: 3, hp: 4 }));
    }

    #[test]
    fn test_header_name_is_trimmed() {
        let pets = parse_chat("[ 루비 ] 페트 검색 결과 입니다.");
        assert!(pets.get("루비").is_some());
        assert!(parse_chat("[  ] 페트 검색 결과 입니다.").is_empty());
    }

    #[test]
    fn test_blank_header_block_is_skipped() {
        let text = "\
[루비] [1등급] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 10, 방어력 5, 순발력 7, 내구력 20
[  ] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 99, 방어력 99, 순발력 99, 내구력 99
기술 : 공격, 속성 : 지10, 경로 : 어딘가
[골드] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 3, 방어력 4, 순발력 5, 내구력 6
";
        let pets = parse_chat(text);
        assert_eq!(pets.len(), 2);

        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.s0, Some(BaseStats { atk: 10, def: 5, agi: 7, hp: 20 }));
        assert_eq!(ruby.attr, None);
        assert_eq!(ruby.route, None);
        assert_eq!(
            pets.get("골드").unwrap().s0,
            Some(BaseStats { atk: 3, def: 4, agi: 5, hp: 6 })
        );
    }

    #[test]
    fn test_parse_header_classification() {
        assert_eq!(
            parse_header("[루비] [2등급] 페트 검색 결과 입니다."),
            HeaderLine::Pet { name: "루비", digit: Some("2") }
        );
        assert_eq!(parse_header("[ ] 페트 검색 결과 입니다."), HeaderLine::Blank);
        assert_eq!(parse_header("루비 페트 검색 결과 입니다."), HeaderLine::NotHeader);
    }

    #[test]
    fn test_full_width_grade_digit_is_normal_header() {
        let text = "\
[루비] [1등급] 페트 검색 결과 입니다.
[골드] [１등급] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 99, 방어력 99, 순발력 99, 내구력 99
";
        let pets = parse_chat(text);
        assert_eq!(pets.len(), 2);
        assert_eq!(pets.get("루비").unwrap().s0, None);

        let gold = pets.get("골드").unwrap();
        assert_eq!(gold.grade, Some(Grade::Normal));
        assert_eq!(gold.s0, Some(BaseStats { atk: 99, def: 99, agi: 99, hp: 99 }));
    }

    #[test]
    fn test_full_width_stat_digits() {
        let text = "\
[루비] 페트 검색 결과 입니다.
초기 : 레벨 １, 공격력 １０, 방어력 ５, 순발력 ７, 내구력 ２０
성장 : 공격력 ２.５, 방어력 1.0, 순발력 2, 성장 7.5, 내구력 ２
기술 : 공격, 속성 : 화６ 수４
";
        let pets = parse_chat(text);
        let ruby = pets.get("루비").unwrap();
        assert_eq!(ruby.s0, Some(BaseStats { atk: 10, def: 5, agi: 7, hp: 20 }));
        assert_eq!(
            ruby.sg,
            Some(GrowthStats { atk: 2.5, def: 1.0, agi: 2.0, hp: 2.0 })
        );
        assert_eq!(
            ruby.attr,
            Some(Attributes { earth: 0, water: 4, fire: 6, wind: 0 })
        );
    }

    #[test]
    fn test_other_script_digits_leave_line_inert() {
        // Arabic-Indic digits match the pattern but have no accepted value
        let text = "\
[루비] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 ١٠, 방어력 5, 순발력 7, 내구력 20
";
        let pets = parse_chat(text);
        assert_eq!(pets.get("루비").unwrap().s0, None);
        assert_eq!(parse_number::<u32>("١٠"), None);
        assert_eq!(parse_number::<u32>("１２"), Some(12));
    }

    #[test]
    fn test_numbered_lines_counts_crlf_once() {
        let numbers: Vec<usize> = numbered_lines("a\r\nb\r\nc").map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let parts: Vec<(usize, &str)> = numbered_lines("a\rb\nc").collect();
        assert_eq!(parts, vec![(1, "a"), (1, "b"), (2, "c")]);
    }

    #[test]
    fn test_overflowing_stats_are_ignored() {
        let text = "\
[루비] 페트 검색 결과 입니다.
초기 : 레벨 1, 공격력 99999999999, 방어력 5, 순발력 7, 내구력 20
";
        let pets = parse_chat(text);
        assert_eq!(pets.get("루비").unwrap().s0, None);
    }

    #[test]
    fn test_parse_chat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        std::fs::write(&path, RUBY_BLOCK).unwrap();

        let pets = parse_chat_file(&path, ChatEncoding::Utf8).unwrap();
        assert_eq!(pets.len(), 1);
    }
}
