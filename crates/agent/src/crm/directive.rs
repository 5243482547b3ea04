//! System directives injected by the CRM bridge.
//!
//! Directives are written in the user's language. Every gateway data and
//! failure directive is recognisable by [`is_injected_gateway_payload`] so
//! the CRM history profile can drop them on later turns.

use switchyard_core::error::GatewayError;

const JSON_FENCE: &str = "```json";
const FAILURE_TAG_EN: &str = "[CRM gateway error]";
const FAILURE_TAG_JA: &str = "【CRMデータ取得エラー】";

/// Column header of the table the model must render.
pub const TABLE_HEADER: &str = "| No. | Name | Status | Amount | Owner | Updated | Link |";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    /// Japanese when the text contains kana or CJK ideographs.
    pub fn detect(text: &str) -> Self {
        let japanese = text.chars().any(|c| {
            matches!(c,
                '\u{3040}'..='\u{30FF}' // hiragana + katakana
                | '\u{4E00}'..='\u{9FFF}'
                | '\u{FF66}'..='\u{FF9F}')
        });
        if japanese { Self::Japanese } else { Self::English }
    }
}

/// Whether a system turn carries gateway data or a gateway failure notice.
pub fn is_injected_gateway_payload(content: &str) -> bool {
    content.contains(JSON_FENCE) || content.contains(FAILURE_TAG_EN) || content.contains(FAILURE_TAG_JA)
}

/// Answer strictly from the conversation so far.
pub fn follow_up(language: Language) -> String {
    match language {
        Language::Japanese => "\
この質問は直前までの会話に対するフォローアップです。CRMへの再検索は行いません。\n\
会話履歴と、すでに提示した表・要約の内容だけを根拠に回答してください。\n\
履歴に含まれない事実（件数、金額、日付、担当者など）を推測したり断定したりしてはいけません。\n\
根拠が足りない場合はその旨を伝え、条件を変えて再検索できることを提案してください。"
            .into(),
        Language::English => "\
This question follows up on the conversation so far. The CRM will not be queried again.\n\
Answer strictly from the conversation history and the tables or summaries already shown.\n\
Do not assert any fact (counts, amounts, dates, owners) that is not present in that prior context.\n\
If the prior context is not enough, say so and offer to re-run the query with different filters."
            .into(),
    }
}

/// Render gateway JSON for the model, truncated to `max_chars` characters.
pub fn gateway_success(language: Language, result: &serde_json::Value, max_chars: usize) -> String {
    let body = truncate(
        &serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
        max_chars,
    );
    let instructions = match language {
        Language::Japanese => format!(
            "以下はCRMから取得したデータ（JSON）です。このJSONに含まれる事実だけを使って回答してください。\n\
まず次の列構成の表を作成してください:\n{TABLE_HEADER}\n\
Link 列は各レコードのリンクを `[開く](URL)` 形式で記載してください。値がない列は「-」とします。\n\
表の後に3文以内の短い要約を続けてください。JSONにない情報を補ってはいけません。"
        ),
        Language::English => format!(
            "Below is data returned by the CRM (JSON). Use only facts present in this JSON.\n\
First render a table with exactly these columns:\n{TABLE_HEADER}\n\
Fill the Link column with each record's link as `[Open](url)`. Use \"-\" for missing values.\n\
Follow the table with a short summary of at most three sentences. Do not add information that is not in the JSON."
        ),
    };
    format!("{instructions}\n\n{JSON_FENCE}\n{body}\n```")
}

/// Explain a gateway failure so the model can narrate it.
pub fn gateway_failure(language: Language, error: &GatewayError) -> String {
    match language {
        Language::Japanese => {
            let cause = match error {
                GatewayError::NotConfigured => "CRM連携先が設定されていません".to_string(),
                GatewayError::Status { status, .. } => {
                    format!("CRMゲートウェイがエラー応答（HTTP {status}）を返しました")
                }
                GatewayError::Timeout(secs) => format!("CRMゲートウェイが{secs}秒以内に応答しませんでした"),
                GatewayError::Parse(_) => "CRMゲートウェイの応答を解析できませんでした".to_string(),
                GatewayError::Transport(_) => "CRMゲートウェイに接続できませんでした".to_string(),
                GatewayError::Cancelled => "CRMへの問い合わせが中断されました".to_string(),
            };
            format!(
                "{FAILURE_TAG_JA} {cause}。\n\
ユーザーに日本語で、データを取得できなかったことを簡潔に伝えてください。\n\
データを推測して回答してはいけません。時間をおいて再試行するか、解決しない場合はシステム管理者に連絡するよう案内してください。"
            )
        }
        Language::English => {
            let cause = match error {
                GatewayError::NotConfigured => "the CRM integration is not configured".to_string(),
                GatewayError::Status { status, .. } => {
                    format!("the CRM gateway responded with an error (HTTP {status})")
                }
                GatewayError::Timeout(secs) => format!("the CRM gateway did not answer within {secs}s"),
                GatewayError::Parse(_) => "the CRM gateway response could not be parsed".to_string(),
                GatewayError::Transport(_) => "the CRM gateway could not be reached".to_string(),
                GatewayError::Cancelled => "the CRM query was interrupted".to_string(),
            };
            format!(
                "{FAILURE_TAG_EN} The data request failed because {cause}.\n\
Tell the user briefly, in English, that the data could not be retrieved.\n\
Do not guess or invent any data. Suggest trying again later and contacting the system administrator if the problem persists."
            )
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}\n… [truncated {} characters]", total - max_chars)
}
