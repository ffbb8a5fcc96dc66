use serde::{Deserialize, Serialize};

/// A fixed question/answer pair shown to the model before the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub question: String,
    pub answer: String,
}

impl FewShotExample {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

pub fn default_examples() -> Vec<FewShotExample> {
    vec![
        FewShotExample::new(
            "임차인이 대항력을 갖추려면 어떻게 해야 하나요?",
            "주택임대차보호법 제3조(대항력 등) 제1항에 따르면, 임대차는 그 등기가 없는 경우에도 \
임차인이 주택의 인도와 주민등록을 마친 때에는 그 다음 날부터 제삼자에 대하여 효력이 생깁니다. \
이 경우 전입신고를 한 때에 주민등록이 된 것으로 봅니다.",
        ),
        FewShotExample::new(
            "집을 산 사람에게도 임대차를 주장할 수 있나요?",
            "주택임대차보호법 제3조(대항력 등) 제1항 및 제4항에 따르면, 대항력을 갖춘 임차인은 \
주택의 양수인에게도 임대차를 주장할 수 있고, 임차주택의 양수인은 임대인의 지위를 승계한 것으로 봅니다. \
따라서 임차인은 계약기간 동안 거주하고 종료 시 양수인에게 보증금 반환을 청구할 수 있습니다.",
        ),
        FewShotExample::new(
            "임대차 기간을 1년으로 정하면 1년만 살 수 있나요?",
            "주택임대차보호법 제4조(임대차기간 등) 제1항에 따르면, 기간을 정하지 아니하거나 2년 미만으로 \
정한 임대차는 그 기간을 2년으로 봅니다. 다만 임차인은 2년 미만으로 정한 기간이 유효함을 주장할 수 있습니다.",
        ),
    ]
}
