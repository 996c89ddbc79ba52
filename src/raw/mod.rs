mod bucket;
mod raw_multi_dict;

pub(crate) use bucket::Bucket;
pub(crate) use raw_multi_dict::RawMultiDict;
