//! HTML 解析与序列化

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

use crate::error::{LocalizerError, LocalizerResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: Option<&str>) -> LocalizerResult<RcDom> {
    let s: String = match document_encoding.and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| LocalizerError::ParseError(format!("HTML解析失败: {}", e)))
}

/// 序列化节点的全部子节点（对文档节点即完整文档，对元素即 innerHTML）
pub fn serialize_node(node: &Handle, document_encoding: Option<&str>) -> LocalizerResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = node.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| LocalizerError::SerializationError(format!("DOM序列化失败: {}", e)))?;

    let encoding = document_encoding.and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = encoding {
        let s: &str = &String::from_utf8_lossy(&buf);
        let (data, _, _) = encoding.encode(s);
        buf = data.to_vec();
    }

    Ok(buf)
}
