//! Static scripture texts for the reader.

use crate::models::{Scripture, ScriptureSummary};

struct Text {
    id: &'static str,
    title: &'static str,
    short_description: &'static str,
    content: &'static str,
}

const TEXTS: &[Text] = &[
    Text {
        id: "heart",
        title: "마하반야바라밀다심경",
        short_description: "반야심경. 공(空)의 지혜를 담은 가장 널리 독송되는 경전",
        content: "관자재보살 행심반야바라밀다시 조견오온개공 도일체고액\n\
사리자 색불이공 공불이색 색즉시공 공즉시색 수상행식 역부여시\n\
사리자 시제법공상 불생불멸 불구부정 부증불감\n\
시고 공중무색 무수상행식 무안이비설신의 무색성향미촉법\n\
무안계 내지 무의식계 무무명 역무무명진 내지 무노사 역무노사진\n\
무고집멸도 무지 역무득 이무소득고\n\
보리살타 의반야바라밀다고 심무가애 무가애고 무유공포 원리전도몽상 구경열반\n\
삼세제불 의반야바라밀다고 득아뇩다라삼먁삼보리\n\
고지 반야바라밀다 시대신주 시대명주 시무상주 시무등등주\n\
능제일체고 진실불허 고설반야바라밀다주 즉설주왈\n\
\n\
아제아제 바라아제 바라승아제 모지 사바하\n\
아제아제 바라아제 바라승아제 모지 사바하\n\
아제아제 바라아제 바라승아제 모지 사바하",
    },
    Text {
        id: "thousand",
        title: "천수경 (개경게)",
        short_description: "경전을 펼치기 전 마음을 여는 게송과 진언",
        content: "무상심심미묘법 백천만겁난조우\n\
아금문견득수지 원해여래진실의\n\
\n\
정구업진언\n\
수리수리 마하수리 수수리 사바하 (3번)\n\
\n\
오방내외안위제신진언\n\
나모 사만다 못다남 옴 도로도로 지미 사바하 (3번)\n\
\n\
개법장진언\n\
옴 아라남 아라다 (3번)",
    },
];

impl Text {
    fn to_scripture(&self) -> Scripture {
        Scripture {
            id: self.id.to_string(),
            title: self.title.to_string(),
            short_description: self.short_description.to_string(),
            content: self.content.to_string(),
        }
    }
}

/// Every scripture, in reading-list order.
pub fn all() -> Vec<Scripture> {
    TEXTS.iter().map(Text::to_scripture).collect()
}

pub fn summaries() -> Vec<ScriptureSummary> {
    all().iter().map(ScriptureSummary::from).collect()
}

pub fn find(id: &str) -> Option<Scripture> {
    TEXTS.iter().find(|t| t.id == id).map(Text::to_scripture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_heart_sutra_first() {
        let scriptures = all();
        assert_eq!(scriptures.len(), 2);
        assert_eq!(scriptures[0].id, "heart");
        assert!(scriptures[0].content.starts_with("관자재보살"));
    }

    #[test]
    fn heart_sutra_ends_with_mantra_three_times() {
        let heart = find("heart").unwrap();
        let mantra = "아제아제 바라아제 바라승아제 모지 사바하";
        assert_eq!(heart.content.matches(mantra).count(), 3);
        assert!(heart.content.ends_with(mantra));
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(find("diamond").is_none());
    }

    #[test]
    fn summaries_omit_content() {
        let summaries = summaries();
        assert_eq!(summaries[1].title, "천수경 (개경게)");
    }
}
