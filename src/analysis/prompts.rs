//! LLM 提示詞。指示用英文撰寫，輸出一律要求韓文。

/// 8-K 分析：要求回傳 `{title, narrative, filing_date}` JSON
pub fn filing_analysis(filing_date: &str, content: &str) -> String {
    format!(
        r#"You are a financial analyst who reads SEC Form 8-K filings.

Filing date: {filing_date}
Document content:
{content}

Reply with a single JSON object and nothing else, in exactly this shape:

{{
  "title": "A specific title in Korean that captures the core of the filing (at most 50 characters)",
  "narrative": "A Korean narrative of 2-3 paragraphs (4-5 sentences each) that explains the filing as a story, using connectives so it reads smoothly",
  "filing_date": "{filing_date}"
}}
"#
    )
}

/// 個股新聞摘要 (Markdown)
pub fn stock_summary(stock_name: &str, articles: &str) -> String {
    format!(
        "You are a professional investment news summarizer. Read the English articles below \
         and summarize them. The summary MUST be written in Korean; an English summary is rejected.\n\n\
         These articles are about `{stock_name}`. Focus on what they mean for this company.\n\n\
         Format the summary as Markdown:\n\
         1. Start each heading with `###` and name a key theme.\n\
         2. Under each heading write a paragraph of 1-3 lines. Skip introductions and conclusions.\n\
         3. Do not include speculative numeric forecasts, investment advice, or article links.\n\
         4. Use only 2-3 headings in total.\n\n\
         Articles:\n\n{articles}"
    )
}

/// 投資傾向名稱對應的說明；未知傾向視為一般投資人
pub fn investor_profile(investment_type: &str) -> &'static str {
    match investment_type {
        "안정형" => "안정형 (capital preservation comes first)",
        "보수형" => "보수형 (modest returns with low risk)",
        "적극형" => "적극형 (accepts some risk for returns and growth)",
        "공격형" => "공격형 (maximum returns, accepts high risk)",
        _ => "a general investor",
    }
}

/// 依投資傾向產生一句評論
pub fn commentary(investment_type: &str, summary: &str) -> String {
    format!(
        "The user has already read the news summary below. Based on it, write a short comment \
         that helps a user whose investment profile is {profile}.\n\
         - Rather than a detailed explanation, give about one sentence of advice or insight on how \
         this investor should take the news.\n\
         - Write in polite Korean (존댓말), like an investment assistant.\n\
         - Keep it within 200 characters.\n\
         - Use a single natural declarative sentence.\n\n\
         News summary:\n{summary}",
        profile = investor_profile(investment_type)
    )
}

/// 會員當日總評 (3-5 則，開頭加 emoji)
pub fn total_summary(comments: &str) -> String {
    format!(
        "Below are today's investment comments for one user's holdings. Write 3-5 key takeaways in Korean.\n\n\
         Format each takeaway as:\n\
         [emoji] title\n\
         one-line explanation\n\n\
         Example:\n\
         📉 기술주 약세\n\
         금리 인상 우려로 기술주 중심의 하락세가 나타났습니다.\n\n\
         📈 반도체 강세\n\
         AI 수요 확대에 따라 반도체 종목이 상승했습니다.\n\n\
         💡 투자 코멘트\n\
         단기적인 시장 변동성에 대비해 포트폴리오 점검이 필요합니다.\n\n\
         Cover gains, declines, an overall comment and advice. Emoji such as 📉📈💡🔥 are welcome. \
         Separate takeaways with a blank line.\n\n{comments}"
    )
}

/// 總評產生失敗時的固定文字
pub const TOTAL_SUMMARY_FALLBACK: &str = "요약 생성에 실패했습니다.";
