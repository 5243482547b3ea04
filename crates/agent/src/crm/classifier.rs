//! Follow-up classifier for CRM threads.
//!
//! Decides whether a message can be answered from the conversation so far
//! or needs a fresh gateway query. Rules are evaluated in order and the
//! first match wins; with no match the message is re-queried.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Longest message (in characters) the demonstrative rule applies to.
pub const SHORT_MESSAGE_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Answer from history only.
    FollowUp,
    /// Query the gateway again.
    Requery,
}

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    intent: Intent,
}

static DATA_NOUNS: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"案件|商談|取引先|顧客|アカウント|活動|売上|受注|失注|金額|レコード|リード|コンタクト|パイプライン|\b(records?|accounts?|opportunit(y|ies)|deals?|activit(y|ies)|sales|revenue|won|lost|leads?|contacts?|pipeline)\b",
    )
});

static REQUERY: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"一覧|リスト|検索|探して|絞り込|絞って|並べ|並び替え|ソート|上位|トップ|件数|次のページ|期間|今日|昨日|今週|先週|今月|先月|今期|前期|今年|昨年|去年|以上|以下|未満|比較|ランキング|[<>]=?|\b(list|show|search|find|filter|sort|order by|top \d+|page|today|yesterday|this (week|month|quarter|year)|last (week|month|quarter|year)|between|more than|less than|greater than|at least|compare|rank(ing)?)\b",
    )
});

static ANALYSIS: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"理由|原因|なぜ|何故|背景|改善|提案|次のアクション|ネクストアクション|リスク|示唆|要因|どうすれば|\b(why|reasons?|causes?|background|improve(ment)?s?|suggest(ion)?s?|propos(e|al)s?|recommend(ation)?s?|next (steps?|actions?)|risks?|implications?|insights?)\b",
    )
});

static DEMONSTRATIVE: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"^(その|この|あの|それ|これ|あれ|上記|前述|先ほど|さきほど|さっき|今の|(that|this|those|these|it|the above|above|earlier)\b)",
    )
});

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid classifier pattern: {e}"))
}

fn mentions_data(text: &str) -> bool {
    DATA_NOUNS.is_match(text)
}

fn asks_to_requery(text: &str) -> bool {
    REQUERY.is_match(text)
}

fn asks_for_analysis(text: &str) -> bool {
    ANALYSIS.is_match(text)
}

fn short_reference(text: &str) -> bool {
    text.chars().count() <= SHORT_MESSAGE_CHARS && DEMONSTRATIVE.is_match(text)
}

static RULES: [Rule; 4] = [
    Rule { name: "data_noun", matches: mentions_data, intent: Intent::Requery },
    Rule { name: "requery_vocabulary", matches: asks_to_requery, intent: Intent::Requery },
    Rule { name: "analysis_vocabulary", matches: asks_for_analysis, intent: Intent::FollowUp },
    Rule { name: "short_demonstrative", matches: short_reference, intent: Intent::FollowUp },
];

/// Name of the first rule matching `message`, if any.
pub fn matched_rule(message: &str) -> Option<&'static str> {
    let text = normalize(message);
    RULES.iter().find(|r| (r.matches)(&text)).map(|r| r.name)
}

pub fn classify(message: &str) -> Intent {
    let text = normalize(message);
    RULES
        .iter()
        .find(|r| (r.matches)(&text))
        .map_or(Intent::Requery, |r| r.intent)
}

pub fn is_follow_up(message: &str) -> bool {
    classify(message) == Intent::FollowUp
}

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}
