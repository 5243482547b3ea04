//! Keyword tables for overlay styling instructions.
//!
//! Every table is an ordered list of [`Rule`]s evaluated first-match-wins,
//! so the precedence of overlapping phrases is the order of the table.
//! Patterns are matched against lower-cased text and cover Japanese and
//! English phrasing.

use std::sync::LazyLock;

use regex_lite::Regex;
use switchyard_core::overlay::{FontFamily, HorizontalAlign, SizeAdjust, SizeBucket, VerticalAlign};

/// Pixel delta contributed by one nudge phrase or arrow.
pub const NUDGE_PX: i32 = 20;

/// A named pattern and what it means when it matches.
#[derive(Debug)]
pub struct Rule<T> {
    pub name: &'static str,
    pub pattern: Regex,
    pub outcome: T,
}

fn rule<T>(name: &'static str, pattern: &str, outcome: T) -> Rule<T> {
    Rule {
        name,
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern for {name}: {e}")),
        outcome,
    }
}

/// First rule whose pattern matches `text`.
pub fn first_match<'r, T>(rules: &'r [Rule<T>], text: &str) -> Option<&'r Rule<T>> {
    rules.iter().find(|r| r.pattern.is_match(text))
}

const JA_A_LITTLE: &str = "(?:もう少し|もうちょっと|少し|ちょっと|やや|わずかに|気持ち)(?:だけ)?";

/// Nudge direction in screen coordinates: (dx, dy) per match.
pub static NUDGES: LazyLock<Vec<Rule<(i32, i32)>>> = LazyLock::new(|| {
    let en = |dir: &str, alt: &str| {
        format!(
            r"(?:a (?:little(?: bit)?|bit|tad) (?:more )?(?:to the )?(?:{dir}|{alt})|slightly (?:to the )?(?:{dir}|{alt})|nudge (?:it )?(?:{dir}|{alt})|move (?:it |the text )?(?:to the )?{dir}\b)"
        )
    };
    vec![
        rule(
            "nudge_right",
            &format!(r"{JA_A_LITTLE}右|右に{JA_A_LITTLE}|{}|→|➡|⇒", en("right", "rightward")),
            (NUDGE_PX, 0),
        ),
        rule(
            "nudge_left",
            &format!(r"{JA_A_LITTLE}左|左に{JA_A_LITTLE}|{}|←|⬅|⇐", en("left", "leftward")),
            (-NUDGE_PX, 0),
        ),
        rule(
            "nudge_up",
            &format!(r"{JA_A_LITTLE}上|上に{JA_A_LITTLE}|{}|↑|⬆", en("up", "higher")),
            (0, -NUDGE_PX),
        ),
        rule(
            "nudge_down",
            &format!(r"{JA_A_LITTLE}下|下に{JA_A_LITTLE}|{}|↓|⬇", en("down", "lower")),
            (0, NUDGE_PX),
        ),
    ]
});

/// Relative size requests; checked before [`ABSOLUTE_SIZES`].
pub static RELATIVE_SIZES: LazyLock<Vec<Rule<SizeAdjust>>> = LazyLock::new(|| {
    let ja_more = "(?:もう少し|もうちょっと|もっと|さらに|更に|少し|ちょっと|やや|一回り|ひとまわり)";
    vec![
        rule(
            "larger",
            &format!(r"{ja_more}\s*(?:大きく|大き目|大きめ)|拡大|\bbigger\b|\blarger\b|\benlarge\b|\bincrease the size\b|\bsize up\b"),
            SizeAdjust::Larger,
        ),
        rule(
            "smaller",
            &format!(r"{ja_more}\s*(?:小さく|小さ目|小さめ)|縮小|\bsmaller\b|\bshrink\b|\bdecrease the size\b|\bsize down\b"),
            SizeAdjust::Smaller,
        ),
    ]
});

pub static ABSOLUTE_SIZES: LazyLock<Vec<Rule<SizeBucket>>> = LazyLock::new(|| {
    vec![
        rule(
            "xlarge",
            r"特大|最大|とても大きく|すごく大きく|巨大|\bextra[- ]?large\b|\bx-?large\b|\bhuge\b|\bbiggest\b|\bmassive\b",
            SizeBucket::Xlarge,
        ),
        rule(
            "small",
            r"小さめ|小さ目|小さい|\bsmall\b|\btiny\b",
            SizeBucket::Small,
        ),
        rule(
            "medium",
            r"中くらい|普通の?サイズ|標準サイズ|中サイズ|\bmedium\b|\bnormal size\b",
            SizeBucket::Medium,
        ),
        rule(
            "large",
            r"大きめ|大き目|大きい|\blarge\b|\bbig\b",
            SizeBucket::Large,
        ),
    ]
});

/// Bare "大きく"/"小さく": a step from the remembered size, or the matching
/// bucket on a first placement. Checked after [`ABSOLUTE_SIZES`].
pub static SIZE_VERBS: LazyLock<Vec<Rule<SizeAdjust>>> = LazyLock::new(|| {
    vec![
        rule("bigger_ja", r"大きく", SizeAdjust::Larger),
        rule("smaller_ja", r"小さく", SizeAdjust::Smaller),
    ]
});

/// Corner shortcuts set both axes and suppress the independent matchers.
pub static CORNERS: LazyLock<Vec<Rule<(HorizontalAlign, VerticalAlign)>>> = LazyLock::new(|| {
    use HorizontalAlign::{Left, Right};
    use VerticalAlign::{Bottom, Top};
    vec![
        rule("top_left", r"左上|\b(?:top|upper)[- ]?left\b", (Left, Top)),
        rule("top_right", r"右上|\b(?:top|upper)[- ]?right\b", (Right, Top)),
        rule("bottom_left", r"左下|\b(?:bottom|lower)[- ]?left\b", (Left, Bottom)),
        rule("bottom_right", r"右下|\b(?:bottom|lower)[- ]?right\b", (Right, Bottom)),
    ]
});

pub static VERTICAL: LazyLock<Vec<Rule<VerticalAlign>>> = LazyLock::new(|| {
    vec![
        rule(
            "top",
            r"上部|上端|上側|上寄せ|一番上|上の方|上に|上へ|\btop\b|\bupper\b",
            VerticalAlign::Top,
        ),
        rule(
            "bottom",
            r"下部|下端|下側|下寄せ|一番下|下の方|下に|下へ|\bbottom\b|\blower\b",
            VerticalAlign::Bottom,
        ),
    ]
});

/// Centering words; imply vertical middle only when no vertical keyword matched.
pub static MIDDLE: LazyLock<Rule<VerticalAlign>> = LazyLock::new(|| {
    rule(
        "middle",
        r"中央|真ん中|まんなか|中心|\bmiddle\b|\bcent(?:er|re)(?:ed)?\b",
        VerticalAlign::Middle,
    )
});

pub static HORIZONTAL: LazyLock<Vec<Rule<HorizontalAlign>>> = LazyLock::new(|| {
    vec![
        rule("left", r"左|\bleft\b", HorizontalAlign::Left),
        rule("right", r"右|\bright\b", HorizontalAlign::Right),
    ]
});

/// Centering words for the horizontal axis; only consulted when neither
/// left/right nor a corner matched.
pub static CENTER: LazyLock<Rule<HorizontalAlign>> = LazyLock::new(|| {
    rule(
        "center",
        r"中央|真ん中|まんなか|中心|\bcent(?:er|re)(?:ed)?\b|\bmiddle\b",
        HorizontalAlign::Center,
    )
});

/// Phrases that ask for a fresh placement without naming an alignment.
pub static PLACEMENT_RESET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"位置をリセット|元の位置|初期位置|\breset (?:the )?position\b|\boriginal position\b")
        .unwrap_or_else(|e| panic!("bad placement reset pattern: {e}"))
});

/// Font families in priority order.
pub static FONTS: LazyLock<Vec<Rule<FontFamily>>> = LazyLock::new(|| {
    vec![
        rule("gothic", r"ゴシック|\bgothic\b|\bsans(?:-serif)?\b", FontFamily::Gothic),
        rule("mincho", r"明朝|\bmincho\b|\bserif\b", FontFamily::Mincho),
        rule("meiryo", r"メイリオ|\bmeiryo\b", FontFamily::Meiryo),
    ]
});

pub static COLORS: LazyLock<Vec<Rule<&'static str>>> = LazyLock::new(|| {
    vec![
        rule("white", r"白|ホワイト|\bwhite\b", "#FFFFFF"),
        rule("black", r"黒|ブラック|\bblack\b", "#000000"),
        rule("red", r"赤|レッド|\bred\b", "#FF0000"),
        rule("blue", r"青|ブルー|\bblue\b", "#0000FF"),
        rule("yellow", r"黄|イエロー|\byellow\b", "#FFFF00"),
        rule("green", r"緑|グリーン|\bgreen\b", "#008000"),
        rule("gold", r"金色|ゴールド|\bgold\b", "#FFD700"),
        rule("pink", r"ピンク|\bpink\b", "#FF69B4"),
        rule("orange", r"オレンジ|\borange\b", "#FFA500"),
        rule("gray", r"灰色|グレー|\bgr[ae]y\b", "#808080"),
    ]
});

const JA_OFF: &str = "(?:を)?(?:解除|やめ|止め|なし|無し|にしない|オフ|外し)";
const EN_OFF: &str = "(?:not|no|without|remove|turn off|disable)(?: the)?";

/// Bold toggles; the "off" rule comes first so "太字解除" is not read as "太字".
pub static BOLD: LazyLock<Vec<Rule<bool>>> = LazyLock::new(|| {
    vec![
        rule(
            "bold_off",
            &format!(r"(?:太字|ボールド){JA_OFF}|\b{EN_OFF} bold\b|\bunbold\b|\bbold off\b"),
            false,
        ),
        rule("bold_on", r"太字|ボールド|\bbold\b", true),
    ]
});

pub static ITALIC: LazyLock<Vec<Rule<bool>>> = LazyLock::new(|| {
    vec![
        rule(
            "italic_off",
            &format!(r"(?:斜体|イタリック){JA_OFF}|\b{EN_OFF} italics?\b|\bitalics? off\b"),
            false,
        ),
        rule("italic_on", r"斜体|イタリック|\bitalics?\b", true),
    ]
});

/// Explicit requests to change the overlay wording.
pub static TEXT_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:文字|テキスト|文言|言葉)(?:を|の内容を)?(?:変更|変え|差し替え|書き換え|修正)|書き換えて|」に(?:変更|変えて)|\bchange the (?:text|wording|words)\b|\bchange text\b|\breplace the text\b|\bnew text\b|\breword\b|\brewrite the text\b",
    )
    .unwrap_or_else(|e| panic!("bad text change pattern: {e}"))
});
